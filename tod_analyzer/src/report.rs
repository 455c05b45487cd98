//! Flat export rows and the CSV exporter.
//!
//! Each table of an [`AnalysisRun`] maps to one row type and one CSV file in
//! a timestamped run directory. Export happens after the in-memory results
//! exist; a failure here is reported to the caller and never invalidates the
//! run itself.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::{
    aggregate::{InstrumentSummary, Opportunity, SectorWindow},
    backtest::{self, BacktestSummary},
    config::AnalysisConfig,
    labels::{
        MoveStrength, PatternReliability, PatternStrength, PositionSize, Quality, RiskLevel,
        SectorPattern, StrategyConfidence, TradingSignal, Viability, VolatilityRank,
    },
    pipeline::AnalysisRun,
    resolution::Resolution,
    stats::WindowStat,
};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

fn round(x: f64, dp: i32) -> f64 {
    let f = 10f64.powi(dp);
    (x * f).round() / f
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowStatRow {
    pub ticker: String,
    pub resolution: Resolution,
    pub window: String,
    pub avg_return_pct: f64,
    pub median_return_pct: f64,
    pub std_dev_pct: f64,
    pub min_return_pct: f64,
    pub max_return_pct: f64,
    pub observations: usize,
    pub positive_returns: usize,
    pub negative_returns: usize,
    pub win_rate_pct: f64,
    pub avg_volume: f64,
    pub volume_ratio: f64,
    pub volatility_rank: VolatilityRank,
    pub pattern_strength: PatternStrength,
    pub trading_signal: TradingSignal,
}

impl From<&WindowStat> for WindowStatRow {
    fn from(s: &WindowStat) -> Self {
        let m = &s.summary;
        Self {
            ticker: s.symbol.clone(),
            resolution: s.resolution,
            window: s.window.clone(),
            avg_return_pct: round(m.mean, 5),
            median_return_pct: round(m.median, 5),
            std_dev_pct: round(m.std, 5),
            min_return_pct: round(m.min, 5),
            max_return_pct: round(m.max, 5),
            observations: m.count,
            positive_returns: m.positive,
            negative_returns: m.negative,
            win_rate_pct: round(s.win_rate, 2),
            avg_volume: s.avg_volume.round(),
            volume_ratio: round(s.volume_ratio, 3),
            volatility_rank: s.volatility,
            pattern_strength: s.strength,
            trading_signal: s.signal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorRow {
    pub window: String,
    pub weighted_return_pct: f64,
    pub instruments_confirming: usize,
    pub total_observations: usize,
    pub return_std_dev: f64,
    pub strongest: String,
    pub weakest: String,
    pub trading_signal: TradingSignal,
    pub pattern_reliability: PatternReliability,
    pub pattern: SectorPattern,
    pub strength: PatternStrength,
}

impl From<&SectorWindow> for SectorRow {
    fn from(w: &SectorWindow) -> Self {
        Self {
            window: w.window.clone(),
            weighted_return_pct: round(w.weighted_mean, 5),
            instruments_confirming: w.confirmations,
            total_observations: w.total_obs,
            return_std_dev: round(w.std, 4),
            strongest: w.strongest.clone(),
            weakest: w.weakest.clone(),
            trading_signal: w.signal,
            pattern_reliability: w.reliability,
            pattern: w.pattern,
            strength: w.strength,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityRow {
    pub ticker: String,
    pub company: String,
    pub price: f64,
    pub entry_window: String,
    pub entry_resolution: Resolution,
    pub entry_return_pct: f64,
    pub entry_observations: usize,
    pub exit_window: String,
    pub exit_resolution: Resolution,
    pub exit_return_pct: f64,
    pub exit_observations: usize,
    pub swing_pct: f64,
    pub quality: Quality,
    pub strategy_confidence: StrategyConfidence,
    pub risk_reward_ratio: f64,
}

impl From<&Opportunity> for OpportunityRow {
    fn from(o: &Opportunity) -> Self {
        Self {
            ticker: o.ticker.clone(),
            company: o.name.clone(),
            price: o.price,
            entry_window: o.entry.window.clone(),
            entry_resolution: o.entry.resolution,
            entry_return_pct: round(o.entry.mean, 4),
            entry_observations: o.entry.observations,
            exit_window: o.exit.window.clone(),
            exit_resolution: o.exit.resolution,
            exit_return_pct: round(o.exit.mean, 4),
            exit_observations: o.exit.observations,
            swing_pct: round(o.swing, 4),
            quality: o.quality,
            strategy_confidence: o.confidence,
            risk_reward_ratio: round(o.risk_reward, 2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveSummaryRow {
    pub ticker: String,
    pub company: String,
    pub price: f64,
    pub avg_daily_volume: f64,
    pub windows_analyzed: usize,
    pub total_observations: usize,
    pub best_window: String,
    pub best_return_pct: f64,
    pub worst_window: String,
    pub worst_return_pct: f64,
    pub intraday_range_pct: f64,
    pub morning_return_pct: f64,
    pub afternoon_return_pct: f64,
    pub morning_afternoon_swing_pct: f64,
    pub morning_dip: MoveStrength,
    pub afternoon_rally: MoveStrength,
    pub pattern_consistency: usize,
    pub viability: Viability,
    pub risk_level: RiskLevel,
    pub position_size: PositionSize,
    pub data_quality: Quality,
}

impl From<&InstrumentSummary> for ExecutiveSummaryRow {
    fn from(s: &InstrumentSummary) -> Self {
        Self {
            ticker: s.ticker.clone(),
            company: s.name.clone(),
            price: s.price,
            avg_daily_volume: s.avg_volume.round(),
            windows_analyzed: s.total_windows,
            total_observations: s.total_obs,
            best_window: s.best.window.clone(),
            best_return_pct: round(s.best.mean, 4),
            worst_window: s.worst.window.clone(),
            worst_return_pct: round(s.worst.mean, 4),
            intraday_range_pct: round(s.intraday_range, 4),
            morning_return_pct: round(s.morning_avg, 4),
            afternoon_return_pct: round(s.afternoon_avg, 4),
            morning_afternoon_swing_pct: round(s.swing, 4),
            morning_dip: s.morning_dip,
            afternoon_rally: s.afternoon_rally,
            pattern_consistency: s.pattern_consistency,
            viability: s.viability,
            risk_level: s.risk_level,
            position_size: s.position_size,
            data_quality: s.data_quality,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRow {
    pub ticker: String,
    pub date: chrono::NaiveDate,
    #[serde(rename = "return")]
    pub ret: f64,
    pub return_pct: f64,
    pub cumulative_return: f64,
}

impl TradeRow {
    pub fn rows(summary: &BacktestSummary) -> Vec<TradeRow> {
        summary
            .trades
            .iter()
            .zip(backtest::cumulative(&summary.trades))
            .map(|(t, cum)| TradeRow {
                ticker: summary.ticker.clone(),
                date: t.date,
                ret: t.ret,
                return_pct: t.return_pct(),
                cumulative_return: cum,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataRow {
    pub analyzed_at: String,
    pub timezone: String,
    pub session: String,
    pub window_minutes: u32,
    pub instruments_configured: usize,
    pub instruments_screened: usize,
    pub instruments_analyzed: usize,
    pub total_windows: usize,
    pub total_observations: usize,
    pub min_price: f64,
    pub data_source: String,
}

impl MetadataRow {
    pub fn new(run: &AnalysisRun, cfg: &AnalysisConfig, tz: Tz, data_source: &str) -> Self {
        Self {
            analyzed_at: run
                .started_at
                .with_timezone(&tz)
                .format("%Y-%m-%d %H:%M:%S %Z")
                .to_string(),
            timezone: tz.name().to_string(),
            session: format!("{}-{}", cfg.session.open, cfg.session.close),
            window_minutes: cfg.session.window_minutes,
            instruments_configured: cfg.universe.instruments.len(),
            instruments_screened: run.screened,
            instruments_analyzed: run.analyses.len(),
            total_windows: run.window_stats().count(),
            total_observations: run.total_observations(),
            min_price: cfg.universe.min_price,
            data_source: data_source.to_string(),
        }
    }
}

/// Writes a run's tables as CSV files under `<root>/<stamp>/`.
pub struct CsvExporter {
    dir: PathBuf,
}

impl CsvExporter {
    /// Run directory named after the run's start time on the exchange clock.
    pub fn for_run(root: impl AsRef<Path>, run: &AnalysisRun, tz: Tz) -> Self {
        let stamp = run.started_at.with_timezone(&tz).format("%Y%m%d_%H%M%S");
        Self {
            dir: root.as_ref().join(format!("tod_{stamp}")),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write<R: Serialize>(&self, file: &str, rows: &[R]) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(&self.dir).map_err(|source| ExportError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.dir.join(file);
        let csv_err = |source| ExportError::Csv {
            path: path.clone(),
            source,
        };
        let mut writer = csv::Writer::from_path(&path).map_err(csv_err)?;
        for row in rows {
            writer.serialize(row).map_err(csv_err)?;
        }
        writer.flush().map_err(|e| csv_err(e.into()))?;
        info!(path = %path.display(), rows = rows.len(), "exported");
        Ok(path)
    }

    pub fn export_trades(&self, run: &AnalysisRun) -> Result<PathBuf, ExportError> {
        let rows: Vec<TradeRow> = run.backtests().flat_map(TradeRow::rows).collect();
        self.write("trades.csv", &rows)
    }

    /// Every table plus metadata. Returns the files written.
    pub fn export_all(&self, run: &AnalysisRun, meta: &MetadataRow) -> Result<Vec<PathBuf>, ExportError> {
        let stats: Vec<WindowStatRow> = run.window_stats().map(WindowStatRow::from).collect();
        let sector: Vec<SectorRow> = run.sector.iter().map(SectorRow::from).collect();
        let opps: Vec<OpportunityRow> = run.opportunities.iter().map(OpportunityRow::from).collect();
        let summary: Vec<ExecutiveSummaryRow> =
            run.summaries.iter().map(ExecutiveSummaryRow::from).collect();
        Ok(vec![
            self.write("executive_summary.csv", &summary)?,
            self.write("window_stats.csv", &stats)?,
            self.write("sector_windows.csv", &sector)?,
            self.write("opportunities.csv", &opps)?,
            self.export_trades(run)?,
            self.write("metadata.csv", std::slice::from_ref(meta))?,
        ])
    }
}
