//! Console dashboards. Every function renders into a `String`; the CLI
//! decides where it goes.

use crate::{
    backtest::BacktestReport,
    labels::SectorVerdict,
    pipeline::AnalysisRun,
    window::WindowSet,
};

const RULE: usize = 100;

fn rule(c: char) -> String {
    std::iter::repeat_n(c, RULE).collect()
}

fn short(ticker: &str) -> &str {
    ticker.split('.').next().unwrap_or(ticker)
}

/// Sector windows, strongest first.
pub fn render_sector(run: &AnalysisRun) -> String {
    let mut out = String::new();
    out += &format!("{}\nSECTOR TIME-OF-DAY PATTERNS\n{}\n", rule('='), rule('-'));
    out += &format!(
        "{:<13} {:>9} {:>7} {:>7} {:<8} {:<8} {:<17} {:<8}\n",
        "Window", "Return%", "Stocks", "Std", "Best", "Worst", "Signal", "Reliab."
    );
    for w in &run.sector {
        out += &format!(
            "{:<13} {:>9.4} {:>7} {:>7.3} {:<8} {:<8} {:<17} {:<8}\n",
            w.window,
            w.weighted_mean,
            w.confirmations,
            w.std,
            short(&w.strongest),
            short(&w.weakest),
            w.signal,
            w.reliability
        );
    }
    if run.sector.is_empty() {
        out += "  no window is confirmed by enough instruments\n";
    }
    out
}

pub fn render_timing(run: &AnalysisRun) -> String {
    let Some(t) = &run.timing else {
        return String::from("OPTIMAL TIMING: not enough sector data\n");
    };
    format!(
        "OPTIMAL SECTOR TIMING\n  BUY  {} ({:+.4}%, {})\n  SELL {} ({:+.4}%, {})\n  EXPECTED SWING: {:.4}%\n  PATTERN RELIABILITY: {} stocks confirm\n",
        t.entry.window,
        t.entry.weighted_mean,
        t.entry.pattern,
        t.exit.window,
        t.exit.weighted_mean,
        t.exit.pattern,
        t.swing,
        t.confirmations
    )
}

/// Top `n` instruments by swing.
pub fn render_opportunities(run: &AnalysisRun, n: usize) -> String {
    let mut out = format!(
        "{}\nTOP INDIVIDUAL OPPORTUNITIES\n{:<8} {:<12} {:<12} {:>8} {:>8} {:<10}\n{}\n",
        rule('='),
        "Ticker",
        "Entry Time",
        "Exit Time",
        "Swing%",
        "Price",
        "Quality",
        rule('-')
    );
    for o in run.opportunities.iter().take(n) {
        out += &format!(
            "{:<8} {:<12} {:<12} {:>7.2}% ${:>7.2} {:<10}\n",
            short(&o.ticker),
            o.entry.window,
            o.exit.window,
            o.swing,
            o.price,
            o.quality
        );
    }
    out
}

pub fn render_conclusion(run: &AnalysisRun) -> String {
    let c = &run.conclusion;
    let verdict = match c.verdict {
        SectorVerdict::Viable => format!(
            "VIABLE - systematic time-of-day trading, focus on the top {} stocks",
            c.viable
        ),
        SectorVerdict::Selective => format!("SELECTIVE - only trade the top {} performers", c.viable),
        SectorVerdict::NotViable => String::from("NOT VIABLE - insufficient consistent patterns"),
    };
    format!(
        "SECTOR CONCLUSION\n  Average stock swing: {:.2}%\n  Viable strategies: {}/{} stocks\n  Sector strategy: {}\n{}\n",
        c.avg_swing,
        c.viable,
        c.instruments,
        verdict,
        rule('=')
    )
}

pub fn render_backtest(report: &BacktestReport, n: usize) -> String {
    let mut out = format!(
        "{}\nTIME-OF-DAY BACKTEST SUMMARY\n{}\nTotal trades: {}\nProfitable stocks: {}/{}\n",
        rule('='),
        rule('='),
        report.total_trades,
        report.profitable_instruments,
        report.instruments
    );
    out += &format!(
        "\nTOP {n} PERFORMERS\n{:<8} | {:>10} | {:>8} | {:>6}\n{}\n",
        "Ticker",
        "Avg Return",
        "Win Rate",
        "Trades",
        "-".repeat(45)
    );
    for p in report.performers.iter().take(n) {
        out += &format!(
            "{:<8} | {:>9.2}% | {:>7.0}% | {:>6}\n",
            p.ticker, p.mean_return_pct, p.win_rate, p.trades
        );
    }
    if report.total_trades > 0 {
        out += &format!(
            "\nProfitable trades: {}/{} ({:.1}%)\n",
            report.profitable_trades,
            report.total_trades,
            report.trade_win_rate()
        );
    }
    out
}

/// One window name per line.
pub fn render_windows(set: &WindowSet) -> String {
    set.windows()
        .iter()
        .map(|w| format!("{w}\n"))
        .collect()
}

/// Everything the `analyze` command prints.
pub fn render_run(run: &AnalysisRun, top: usize) -> String {
    [
        render_sector(run),
        render_timing(run),
        render_opportunities(run, top),
        render_conclusion(run),
    ]
    .concat()
}
