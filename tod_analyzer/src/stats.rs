//! Per-window return statistics for one series.
//!
//! A return is the percentage close-to-close change between two consecutive
//! bars of a series, attributed to the *later* bar: its time decides the
//! window and its volume is the observation's volume. Consecutive means
//! consecutive in the series, so the first bar of a day carries the overnight
//! move from the previous day's last bar.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{
    config::Thresholds,
    labels::{self, PatternStrength, TradingSignal, VolatilityRank},
    resolution::Resolution,
    series::Series,
    window::WindowSet,
};

/// One surviving return.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub time: NaiveDateTime,
    /// Percent.
    pub ret: f64,
    pub volume: f64,
}

/// Returns of `series` with non-finite values and |r| >= `outlier_pct` dropped.
pub fn observations(series: &Series, outlier_pct: f64) -> Vec<Observation> {
    series
        .bars
        .windows(2)
        .filter_map(|pair| {
            let (prev, cur) = (&pair[0], &pair[1]);
            let ret = (cur.close / prev.close - 1.0) * 100.0;
            (ret.is_finite() && ret.abs() < outlier_pct).then_some(Observation {
                time: cur.time,
                ret,
                volume: cur.volume,
            })
        })
        .collect()
}

/// Descriptive statistics of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub positive: usize,
    pub negative: usize,
}

impl Summary {
    /// Positive share of the sample, in percent.
    pub fn win_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.positive as f64 / self.count as f64 * 100.0
        }
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
pub fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

/// `None` for an empty sample.
pub fn describe(values: &[f64]) -> Option<Summary> {
    let mean = mean(values)?;
    let std = population_std(values)?;
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };
    Some(Summary {
        count: n,
        mean,
        median,
        std,
        min: sorted[0],
        max: sorted[n - 1],
        positive: values.iter().filter(|&&v| v > 0.0).count(),
        negative: values.iter().filter(|&&v| v < 0.0).count(),
    })
}

/// Statistics of one (instrument, resolution, window).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowStat {
    pub symbol: String,
    pub resolution: Resolution,
    pub window: String,
    pub summary: Summary,
    pub win_rate: f64,
    pub avg_volume: f64,
    /// Window average volume over the series average volume (floored at 1).
    pub volume_ratio: f64,
    pub volatility: VolatilityRank,
    pub strength: PatternStrength,
    pub signal: TradingSignal,
}

impl WindowStat {
    pub fn mean(&self) -> f64 {
        self.summary.mean
    }

    pub fn count(&self) -> usize {
        self.summary.count
    }
}

/// Window statistics for `series`, in window order. Windows with fewer than
/// `min_window_obs` observations produce no row.
pub fn analyze_series(series: &Series, windows: &WindowSet, thresholds: &Thresholds) -> Vec<WindowStat> {
    let obs = observations(series, thresholds.outlier_pct);
    let volumes: Vec<f64> = obs.iter().map(|o| o.volume).collect();
    let series_volume = mean(&volumes).unwrap_or(0.0);

    let mut buckets: Vec<Vec<&Observation>> = vec![Vec::new(); windows.len()];
    for o in &obs {
        if let Some(i) = windows.assign(o.time) {
            buckets[i].push(o);
        }
    }

    windows
        .windows()
        .iter()
        .zip(buckets)
        .filter(|(_, bucket)| bucket.len() >= thresholds.min_window_obs)
        .filter_map(|(window, bucket)| {
            let returns: Vec<f64> = bucket.iter().map(|o| o.ret).collect();
            let summary = describe(&returns)?;
            let vols: Vec<f64> = bucket.iter().map(|o| o.volume).collect();
            let avg_volume = mean(&vols).unwrap_or(0.0);
            Some(WindowStat {
                symbol: series.symbol.clone(),
                resolution: series.resolution,
                window: window.name(),
                win_rate: summary.win_rate(),
                avg_volume,
                volume_ratio: avg_volume / series_volume.max(1.0),
                volatility: labels::volatility_rank(summary.std),
                strength: labels::pattern_strength(summary.mean),
                signal: labels::trading_signal(summary.mean, summary.count, thresholds),
                summary,
            })
        })
        .collect()
}
