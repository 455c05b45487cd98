//! Analysis configuration: parsing, normalization and loading.
//!
//! One TOML file drives a run:
//! - `[session]`: exchange timezone, open/close, window width or an explicit
//!   window list, and the morning/afternoon bucket hours
//! - `[thresholds]`: sample-size floors and the outlier cut-off
//! - `[universe]`: minimum price and the ticker -> display name table
//! - `[fetch]`: resolutions with lookback days, concurrency, request rate
//! - `[backtest]`: where the buy/sell windows come from
//! - `[output]`: export directory
//!
//! Every field has a default, so an empty file is a valid configuration.
//! Normalization trims and upper-cases tickers and drops duplicates while
//! keeping the first occurrence.
//!
//! Entrypoints: [`load_config_str`], [`load_config_path`].

use std::{collections::HashSet, mem, path::PathBuf};

use anyhow::{Context, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use toml::from_str;

use crate::{
    resolution::Resolution,
    session::{DayBuckets, Session},
    window::WindowSet,
};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct AnalysisConfig {
    pub session: SessionCfg,
    pub thresholds: Thresholds,
    pub universe: UniverseCfg,
    pub fetch: FetchCfg,
    pub backtest: BacktestCfg,
    pub output: OutputCfg,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct SessionCfg {
    /// IANA name, e.g. `Australia/Perth`.
    pub timezone: String,
    /// `HH:MM` on the exchange clock.
    pub open: String,
    pub close: String,
    pub window_minutes: u32,
    /// Explicit window names; replaces the generated partition when set.
    pub windows: Option<Vec<String>>,
    /// Window start hours counted as "morning"; derived from `open` when unset.
    pub morning_hours: Option<Vec<u32>>,
    pub afternoon_hours: Option<Vec<u32>>,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            timezone: "Australia/Perth".into(),
            open: "10:00".into(),
            close: "15:15".into(),
            window_minutes: 15,
            windows: None,
            morning_hours: None,
            afternoon_hours: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct Thresholds {
    /// Trading-hours bars a series needs to be analyzed.
    pub min_bars: usize,
    /// Returns with |r| at or above this percentage are dropped.
    pub outlier_pct: f64,
    /// Observations a window needs to produce a statistic.
    pub min_window_obs: usize,
    /// Below this count the signal is INSUFFICIENT_DATA.
    pub min_signal_obs: usize,
    /// Distinct instruments a sector window needs.
    pub min_confirmations: usize,
    /// Swing above which an instrument counts as viable.
    pub viable_swing: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_bars: 20,
            outlier_pct: 25.0,
            min_window_obs: 3,
            min_signal_obs: 5,
            min_confirmations: 3,
            viable_swing: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct UniverseCfg {
    /// Instruments at or below this last price are screened out.
    pub min_price: f64,
    /// Calendar days of daily bars fetched for screening (about five sessions).
    pub screen_days: u32,
    /// Ticker -> display name, in run order.
    pub instruments: IndexMap<String, String>,
}

impl Default for UniverseCfg {
    fn default() -> Self {
        let instruments = [
            ("BHP.AX", "BHP Billiton"),
            ("RIO.AX", "Rio Tinto"),
            ("FMG.AX", "Fortescue Metals"),
            ("S32.AX", "South32"),
            ("PLS.AX", "Pilbara Minerals"),
            ("MIN.AX", "Mineral Resources"),
            ("NST.AX", "Northern Star"),
            ("EVN.AX", "Evolution Mining"),
            ("LYC.AX", "Lynas Rare Earths"),
            ("PDN.AX", "Paladin Energy"),
        ]
        .into_iter()
        .map(|(t, n)| (t.to_string(), n.to_string()))
        .collect();
        Self {
            min_price: 0.10,
            screen_days: 7,
            instruments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ResolutionCfg {
    pub interval: Resolution,
    pub lookback_days: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct FetchCfg {
    pub resolutions: Vec<ResolutionCfg>,
    /// Instrument pipelines running at once.
    pub concurrency: usize,
    /// Outgoing request budget for the chart provider.
    pub requests_per_second: u32,
}

impl Default for FetchCfg {
    fn default() -> Self {
        Self {
            resolutions: Resolution::ALL
                .into_iter()
                .map(|interval| ResolutionCfg {
                    interval,
                    lookback_days: interval.default_lookback_days(),
                })
                .collect(),
            concurrency: 4,
            requests_per_second: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSource {
    /// Best/worst windows of the full multi-resolution analysis.
    #[default]
    Session,
    /// Quarter-hour slots computed from the backtest series alone.
    Slots,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct BacktestCfg {
    pub window_source: WindowSource,
    /// Series the trades are replayed on.
    pub resolution: Resolution,
    pub slot_minutes: u32,
    /// A slot needs strictly more observations than this.
    pub min_slot_obs: usize,
}

impl Default for BacktestCfg {
    fn default() -> Self {
        Self {
            window_source: WindowSource::Session,
            resolution: Resolution::FiveMinute,
            slot_minutes: 15,
            min_slot_obs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct OutputCfg {
    pub dir: PathBuf,
    /// Top-N rows in console rankings.
    pub top: usize,
}

impl Default for OutputCfg {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            top: 10,
        }
    }
}

impl AnalysisConfig {
    pub fn session(&self) -> anyhow::Result<Session> {
        let s = &self.session;
        Session::new(&s.timezone, &s.open, &s.close, s.window_minutes)
            .context("invalid [session] settings")
    }

    pub fn window_set(&self, session: &Session) -> WindowSet {
        match &self.session.windows {
            Some(names) => WindowSet::from_names(names, session),
            None => WindowSet::for_session(session),
        }
    }

    /// Morning and afternoon start hours: explicit lists win, otherwise the
    /// session's first two hours and the two after them.
    pub fn day_buckets(&self, session: &Session) -> DayBuckets {
        let derived = DayBuckets::from_open_hour(session.open_hour());
        DayBuckets {
            morning: self.session.morning_hours.clone().unwrap_or(derived.morning),
            afternoon: self.session.afternoon_hours.clone().unwrap_or(derived.afternoon),
        }
    }
}

/// Summary of changes performed during normalization.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    /// Tickers that changed when trimming/upper-casing.
    pub tickers_renamed: usize,
    pub tickers_deduped: usize,
    pub resolutions_deduped: usize,
}

/// Normalize a configuration in place.
///
/// Errors:
/// - empty ticker after trimming
/// - no instruments or no resolutions left
/// - zero concurrency or request rate
/// - invalid session settings
pub fn normalize_config(cfg: &mut AnalysisConfig) -> anyhow::Result<NormalizationReport> {
    let mut report = NormalizationReport::default();

    let mut rebuilt: IndexMap<String, String> = IndexMap::new();
    for (raw, name) in mem::take(&mut cfg.universe.instruments) {
        let ticker = raw.trim().to_uppercase();
        if ticker.is_empty() {
            bail!("ticker cannot be empty after trimming");
        }
        if ticker != raw {
            report.tickers_renamed += 1;
        }
        if rebuilt.contains_key(&ticker) {
            report.tickers_deduped += 1;
            continue;
        }
        rebuilt.insert(ticker, name.trim().to_string());
    }
    if rebuilt.is_empty() {
        bail!("universe.instruments is empty");
    }
    cfg.universe.instruments = rebuilt;

    let before = cfg.fetch.resolutions.len();
    let mut seen = HashSet::new();
    cfg.fetch.resolutions.retain(|r| seen.insert(r.interval));
    report.resolutions_deduped = before - cfg.fetch.resolutions.len();
    if cfg.fetch.resolutions.is_empty() {
        bail!("fetch.resolutions is empty");
    }
    if cfg.fetch.concurrency == 0 {
        bail!("fetch.concurrency must be at least 1");
    }
    if cfg.fetch.requests_per_second == 0 {
        bail!("fetch.requests_per_second must be at least 1");
    }

    cfg.session()?;
    Ok(report)
}

/// Parse and normalize a configuration from a TOML string.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<AnalysisConfig> {
    let mut cfg: AnalysisConfig = from_str(toml_str).context("failed to parse config TOML")?;
    let report = normalize_config(&mut cfg).context("normalize_config failed")?;
    if report != NormalizationReport::default() {
        tracing::debug!(?report, "config normalized");
    }
    Ok(cfg)
}

/// Read a configuration TOML file from disk, parse, and normalize it.
pub fn load_config_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<AnalysisConfig> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    load_config_str(&text)
}
