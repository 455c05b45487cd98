//! Buy-the-dip / sell-the-rally replay over historical days.
//!
//! Each calendar day, buy at the close of the bar stamped exactly at the entry
//! window's end and sell at the close of the bar stamped exactly at the exit
//! window's end. Days missing either bar are skipped. No position sizing, no
//! costs, and the sell bar may come before the buy bar on the clock; the
//! trade is still a close-to-close ratio.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::Serialize;

use crate::{
    series::Series,
    stats::{self, Observation},
    window::{ClockTime, Window},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trade {
    pub date: NaiveDate,
    /// Fractional return, `(sell - buy) / buy`.
    pub ret: f64,
}

impl Trade {
    pub fn return_pct(&self) -> f64 {
        self.ret * 100.0
    }
}

/// One trade per day that has both exact-minute bars, oldest first.
pub fn replay(series: &Series, buy: NaiveTime, sell: NaiveTime) -> Vec<Trade> {
    let same_minute = |t: NaiveTime, target: NaiveTime| {
        t.hour() == target.hour() && t.minute() == target.minute()
    };
    let mut days: BTreeMap<NaiveDate, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for bar in &series.bars {
        let day = days.entry(bar.date()).or_default();
        let t = bar.time.time();
        if day.0.is_none() && same_minute(t, buy) {
            day.0 = Some(bar.close);
        }
        if day.1.is_none() && same_minute(t, sell) {
            day.1 = Some(bar.close);
        }
    }
    days.into_iter()
        .filter_map(|(date, prices)| match prices {
            (Some(b), Some(s)) if b > 0.0 => Some(Trade {
                date,
                ret: (s - b) / b,
            }),
            _ => None,
        })
        .collect()
}

/// Compounded running return after each trade.
pub fn cumulative(trades: &[Trade]) -> Vec<f64> {
    trades
        .iter()
        .scan(1.0, |growth, t| {
            *growth *= 1.0 + t.ret;
            Some(*growth - 1.0)
        })
        .collect()
}

/// Half-open `[start, end)` quarter-hour slots from the open hour through the
/// end of the close hour, used when the backtest picks its own windows.
pub fn slots(open_hour: u32, close_hour: u32, slot_minutes: u32) -> Vec<Window> {
    let step = slot_minutes.clamp(1, 60);
    (open_hour..=close_hour)
        .flat_map(|h| {
            (0..60).step_by(step as usize).map(move |m| {
                let start = h * 60 + m;
                let end = (start + step).min(h * 60 + 60);
                Window::new(ClockTime::from_minutes(start), ClockTime::from_minutes(end))
            })
        })
        .collect()
}

fn in_slot(slot: &Window, o: &Observation) -> bool {
    let minute = o.time.hour() * 60 + o.time.minute();
    minute >= slot.start.total_minutes() && minute < slot.end.total_minutes()
}

/// `(exit, entry)`: highest- and lowest-mean slots with more than `min_obs`
/// observations. First slot wins ties.
pub fn best_worst_slots(
    obs: &[Observation],
    slots: &[Window],
    min_obs: usize,
) -> Option<(Window, Window)> {
    let means: Vec<(Window, f64)> = slots
        .iter()
        .filter_map(|slot| {
            let rets: Vec<f64> = obs.iter().filter(|o| in_slot(slot, o)).map(|o| o.ret).collect();
            (rets.len() > min_obs)
                .then(|| stats::mean(&rets).map(|m| (*slot, m)))
                .flatten()
        })
        .collect();
    let (first, rest) = means.split_first()?;
    let (mut best, mut worst) = (*first, *first);
    for &(w, m) in rest {
        if m > best.1 {
            best = (w, m);
        }
        if m < worst.1 {
            worst = (w, m);
        }
    }
    Some((best.0, worst.0))
}

/// Backtest result for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestSummary {
    pub ticker: String,
    pub entry: String,
    pub exit: String,
    pub trades: Vec<Trade>,
    pub mean_return_pct: f64,
    pub win_rate: f64,
    pub cumulative: Vec<f64>,
}

impl BacktestSummary {
    pub fn new(ticker: impl Into<String>, entry: &Window, exit: &Window, trades: Vec<Trade>) -> Self {
        let rets: Vec<f64> = trades.iter().map(|t| t.ret).collect();
        let wins = rets.iter().filter(|&&r| r > 0.0).count();
        Self {
            ticker: ticker.into(),
            entry: entry.name(),
            exit: exit.name(),
            mean_return_pct: stats::mean(&rets).unwrap_or(0.0) * 100.0,
            win_rate: if rets.is_empty() {
                0.0
            } else {
                wins as f64 / rets.len() as f64 * 100.0
            },
            cumulative: cumulative(&trades),
            trades,
        }
    }

    pub fn profitable_trades(&self) -> usize {
        self.trades.iter().filter(|t| t.ret > 0.0).count()
    }
}

/// Replay `series` buying at `entry`'s end and selling at `exit`'s end.
pub fn run(ticker: &str, series: &Series, entry: &Window, exit: &Window) -> Option<BacktestSummary> {
    let trades = replay(series, entry.end_time()?, exit.end_time()?);
    Some(BacktestSummary::new(ticker, entry, exit, trades))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Performer {
    pub ticker: String,
    pub mean_return_pct: f64,
    pub win_rate: f64,
    pub trades: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BacktestReport {
    /// Instruments with at least one trade.
    pub instruments: usize,
    pub total_trades: usize,
    pub profitable_instruments: usize,
    pub profitable_trades: usize,
    /// Best mean return first.
    pub performers: Vec<Performer>,
}

impl BacktestReport {
    pub fn from_summaries<'a>(summaries: impl IntoIterator<Item = &'a BacktestSummary>) -> Self {
        let mut report = Self::default();
        for s in summaries.into_iter().filter(|s| !s.trades.is_empty()) {
            report.instruments += 1;
            report.total_trades += s.trades.len();
            report.profitable_trades += s.profitable_trades();
            if s.mean_return_pct > 0.0 {
                report.profitable_instruments += 1;
            }
            report.performers.push(Performer {
                ticker: s.ticker.clone(),
                mean_return_pct: s.mean_return_pct,
                win_rate: s.win_rate,
                trades: s.trades.len(),
            });
        }
        report
            .performers
            .sort_by(|a, b| b.mean_return_pct.total_cmp(&a.mean_return_pct));
        report
    }

    /// Profitable share of all trades, in percent.
    pub fn trade_win_rate(&self) -> f64 {
        if self.total_trades == 0 {
            0.0
        } else {
            self.profitable_trades as f64 / self.total_trades as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{resolution::Resolution, series::LocalBar};
    use chrono::NaiveDateTime;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn bar(t: NaiveDateTime, close: f64) -> LocalBar {
        LocalBar {
            time: t,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }

    fn series(bars: Vec<LocalBar>) -> Series {
        Series {
            symbol: "FMG.AX".into(),
            resolution: Resolution::FiveMinute,
            bars,
        }
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn trades_use_exact_boundary_bars() {
        let s = series(vec![
            bar(at(3, 11, 0), 10.0),
            bar(at(3, 14, 15), 10.5),
            bar(at(4, 11, 0), 10.0),
            bar(at(4, 14, 15), 9.0),
        ]);
        let trades = replay(&s, hm(11, 0), hm(14, 15));
        assert_eq!(trades.len(), 2);
        assert!((trades[0].ret - 0.05).abs() < 1e-12);
        assert!((trades[1].ret + 0.1).abs() < 1e-12);
        assert!(trades[0].date < trades[1].date);
    }

    #[test]
    fn days_without_boundary_bars_yield_no_trades() {
        let s = series(vec![
            bar(at(3, 11, 5), 10.0),
            bar(at(3, 14, 15), 10.5),
            bar(at(4, 11, 0), 10.0),
            bar(at(4, 14, 20), 9.0),
        ]);
        assert!(replay(&s, hm(11, 0), hm(14, 15)).is_empty());
    }

    #[test]
    fn cumulative_compounds() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let trades = [Trade { date: d, ret: 0.1 }, Trade { date: d, ret: -0.1 }];
        let c = cumulative(&trades);
        assert!((c[0] - 0.1).abs() < 1e-12);
        assert!((c[1] - (1.1 * 0.9 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn slots_cover_open_to_close_hour() {
        let s = slots(10, 15, 15);
        assert_eq!(s.len(), 24);
        assert_eq!(s[0].name(), "10:00-10:15");
        assert_eq!(s[3].name(), "10:45-11:00");
        assert_eq!(s[3].end_time(), Some(hm(11, 0)));
        assert_eq!(s[23].name(), "15:45-16:00");
    }

    #[test]
    fn slot_picking_needs_more_than_min_obs() {
        let mk = |h, m, ret| Observation {
            time: at(3, h, m),
            ret,
            volume: 0.0,
        };
        let mut obs = Vec::new();
        for _ in 0..6 {
            obs.push(mk(10, 0, -0.2)); // [10:00, 10:15)
            obs.push(mk(13, 20, 0.3)); // [13:15, 13:30)
        }
        for _ in 0..5 {
            obs.push(mk(11, 0, 5.0)); // only five, ignored
        }
        let (exit, entry) = best_worst_slots(&obs, &slots(10, 15, 15), 5).unwrap();
        assert_eq!(entry.name(), "10:00-10:15");
        assert_eq!(exit.name(), "13:15-13:30");
        assert!(best_worst_slots(&obs[..4], &slots(10, 15, 15), 5).is_none());
    }

    #[test]
    fn summary_and_report() {
        let entry = Window::parse("10:45-11:00").unwrap();
        let exit = Window::parse("14:00-14:15").unwrap();
        let s = series(vec![
            bar(at(3, 11, 0), 10.0),
            bar(at(3, 14, 15), 11.0),
            bar(at(4, 11, 0), 10.0),
            bar(at(4, 14, 15), 9.5),
        ]);
        let a = run("FMG.AX", &s, &entry, &exit).unwrap();
        assert_eq!(a.trades.len(), 2);
        assert!((a.mean_return_pct - 2.5).abs() < 1e-9);
        assert_eq!(a.win_rate, 50.0);
        assert_eq!(a.entry, "10:45-11:00");

        let empty = BacktestSummary::new("BHP.AX", &entry, &exit, vec![]);
        let report = BacktestReport::from_summaries([&a, &empty]);
        assert_eq!(report.instruments, 1);
        assert_eq!(report.total_trades, 2);
        assert_eq!(report.profitable_trades, 1);
        assert_eq!(report.profitable_instruments, 1);
        assert_eq!(report.trade_win_rate(), 50.0);
        assert_eq!(report.performers[0].ticker, "FMG.AX");
    }
}
