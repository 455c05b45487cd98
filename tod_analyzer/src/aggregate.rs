//! Cross-sectional aggregation: sector-wide window rankings and per-instrument
//! rollups (opportunity, executive summary, sector conclusion).
//!
//! All functions here are pure and single-threaded; they run on the merged
//! results after every instrument pipeline has finished.

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    config::Thresholds,
    labels::{
        self, MoveStrength, PatternReliability, PatternStrength, PositionSize, Quality, RiskLevel,
        SectorPattern, SectorVerdict, StrategyConfidence, TradingSignal, Viability,
    },
    resolution::Resolution,
    session::DayBuckets,
    stats::{self, WindowStat},
    universe::Instrument,
    window::Window,
};

/// One window across the sector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorWindow {
    pub window: String,
    /// Observation-weighted mean of the instruments' means.
    pub weighted_mean: f64,
    /// Distinct instruments with a statistic for this window.
    pub confirmations: usize,
    pub total_obs: usize,
    /// Population std of the instrument means.
    pub std: f64,
    pub strongest: String,
    pub weakest: String,
    pub signal: TradingSignal,
    pub reliability: PatternReliability,
    pub pattern: SectorPattern,
    pub strength: PatternStrength,
}

/// One instrument's share of a sector window, all resolutions folded in.
#[derive(Debug, Clone, Copy, Default)]
struct Contribution {
    weighted_sum: f64,
    observations: usize,
}

impl Contribution {
    fn mean(&self) -> f64 {
        if self.observations == 0 {
            0.0
        } else {
            self.weighted_sum / self.observations as f64
        }
    }
}

/// Sector rows sorted by weighted mean, strongest first. Windows confirmed by
/// fewer than `min_confirmations` instruments produce no row.
pub fn sector_windows<'a>(
    stats: impl IntoIterator<Item = &'a WindowStat>,
    thresholds: &Thresholds,
) -> Vec<SectorWindow> {
    let mut by_window: IndexMap<&str, IndexMap<&str, Contribution>> = IndexMap::new();
    for s in stats {
        let c = by_window
            .entry(s.window.as_str())
            .or_default()
            .entry(s.symbol.as_str())
            .or_default();
        c.weighted_sum += s.mean() * s.count() as f64;
        c.observations += s.count();
    }

    let mut rows: Vec<SectorWindow> = by_window
        .into_iter()
        .filter(|(_, per_instrument)| per_instrument.len() >= thresholds.min_confirmations)
        .filter_map(|(window, per_instrument)| {
            let total_obs: usize = per_instrument.values().map(|c| c.observations).sum();
            if total_obs == 0 {
                return None;
            }
            let weighted_sum: f64 = per_instrument.values().map(|c| c.weighted_sum).sum();
            let weighted_mean = weighted_sum / total_obs as f64;
            let means: Vec<f64> = per_instrument.values().map(Contribution::mean).collect();
            let std = stats::population_std(&means).unwrap_or(0.0);

            let mut it = per_instrument.iter();
            let (first, c0) = it.next()?;
            let (mut strongest, mut hi) = (*first, c0.mean());
            let (mut weakest, mut lo) = (*first, c0.mean());
            for (symbol, c) in it {
                let m = c.mean();
                if m > hi {
                    (strongest, hi) = (*symbol, m);
                }
                if m < lo {
                    (weakest, lo) = (*symbol, m);
                }
            }

            let confirmations = per_instrument.len();
            Some(SectorWindow {
                window: window.to_string(),
                weighted_mean,
                confirmations,
                total_obs,
                std,
                strongest: strongest.to_string(),
                weakest: weakest.to_string(),
                signal: labels::trading_signal(weighted_mean, confirmations, thresholds),
                reliability: labels::pattern_reliability(confirmations, std),
                pattern: labels::sector_pattern(weighted_mean),
                strength: labels::pattern_strength(weighted_mean),
            })
        })
        .collect();

    rows.sort_by(|a, b| b.weighted_mean.total_cmp(&a.weighted_mean));
    rows
}

/// Best entry and exit for the sector as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorTiming {
    /// Lowest weighted mean: buy here.
    pub entry: SectorWindow,
    /// Highest weighted mean: sell here.
    pub exit: SectorWindow,
    pub swing: f64,
    /// Instruments behind the weaker of the two windows.
    pub confirmations: usize,
}

/// `rows` as returned by [`sector_windows`].
pub fn sector_timing(rows: &[SectorWindow]) -> Option<SectorTiming> {
    let exit = rows.first()?.clone();
    let entry = rows.last()?.clone();
    Some(SectorTiming {
        swing: exit.weighted_mean - entry.weighted_mean,
        confirmations: exit.confirmations.min(entry.confirmations),
        entry,
        exit,
    })
}

/// A window picked out of an instrument's statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowPick {
    pub window: String,
    pub resolution: Resolution,
    pub mean: f64,
    pub observations: usize,
}

impl From<&WindowStat> for WindowPick {
    fn from(s: &WindowStat) -> Self {
        Self {
            window: s.window.clone(),
            resolution: s.resolution,
            mean: s.mean(),
            observations: s.count(),
        }
    }
}

/// First statistic with the extreme mean under `wins`.
fn extreme<'a>(stats: &'a [WindowStat], wins: Ordering) -> Option<&'a WindowStat> {
    let mut it = stats.iter();
    let mut pick = it.next()?;
    for s in it {
        if s.mean().total_cmp(&pick.mean()) == wins {
            pick = s;
        }
    }
    Some(pick)
}

/// Highest- and lowest-mean statistics across every resolution.
pub fn best_and_worst(stats: &[WindowStat]) -> Option<(&WindowStat, &WindowStat)> {
    Some((extreme(stats, Ordering::Greater)?, extreme(stats, Ordering::Less)?))
}

/// Buy at the worst window, sell at the best.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opportunity {
    pub ticker: String,
    pub name: String,
    pub price: f64,
    pub entry: WindowPick,
    pub exit: WindowPick,
    /// `exit.mean - entry.mean`; never negative.
    pub swing: f64,
    pub quality: Quality,
    pub confidence: StrategyConfidence,
    pub risk_reward: f64,
}

pub fn opportunity(instrument: &Instrument, stats: &[WindowStat]) -> Option<Opportunity> {
    let (best, worst) = best_and_worst(stats)?;
    let min_obs = best.count().min(worst.count());
    Some(Opportunity {
        ticker: instrument.ticker.clone(),
        name: instrument.name.clone(),
        price: instrument.price,
        swing: best.mean() - worst.mean(),
        quality: labels::opportunity_quality(min_obs),
        confidence: labels::strategy_confidence(min_obs),
        risk_reward: best.mean().abs() / worst.mean().abs().max(0.01),
        entry: worst.into(),
        exit: best.into(),
    })
}

/// Executive-summary row for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentSummary {
    pub ticker: String,
    pub name: String,
    pub price: f64,
    pub avg_volume: f64,
    pub total_windows: usize,
    pub total_obs: usize,
    pub best: WindowPick,
    pub worst: WindowPick,
    /// Best minus worst window mean.
    pub intraday_range: f64,
    pub morning_avg: f64,
    pub afternoon_avg: f64,
    /// Afternoon minus morning.
    pub swing: f64,
    pub morning_dip: MoveStrength,
    pub afternoon_rally: MoveStrength,
    /// Distinct windows with |mean| > 0.1.
    pub pattern_consistency: usize,
    pub viability: Viability,
    pub risk_level: RiskLevel,
    pub position_size: PositionSize,
    pub data_quality: Quality,
}

/// Observation-weighted mean of the statistics whose window starts in `hours`.
fn bucket_average(stats: &[WindowStat], hours: &[u32]) -> f64 {
    let (sum, obs) = stats
        .iter()
        .filter(|s| {
            Window::parse(&s.window).is_ok_and(|w| hours.contains(&w.start_hour()))
        })
        .fold((0.0, 0usize), |(sum, obs), s| {
            (sum + s.mean() * s.count() as f64, obs + s.count())
        });
    if obs == 0 { 0.0 } else { sum / obs as f64 }
}

pub fn instrument_summary(
    instrument: &Instrument,
    stats: &[WindowStat],
    buckets: &DayBuckets,
) -> Option<InstrumentSummary> {
    let (best, worst) = best_and_worst(stats)?;
    let morning_avg = bucket_average(stats, &buckets.morning);
    let afternoon_avg = bucket_average(stats, &buckets.afternoon);
    let swing = afternoon_avg - morning_avg;
    let total_obs = stats.iter().map(WindowStat::count).sum();

    let mut consistent: Vec<&str> = stats
        .iter()
        .filter(|s| s.mean().abs() > 0.1)
        .map(|s| s.window.as_str())
        .collect();
    consistent.sort_unstable();
    consistent.dedup();

    Some(InstrumentSummary {
        ticker: instrument.ticker.clone(),
        name: instrument.name.clone(),
        price: instrument.price,
        avg_volume: instrument.avg_volume,
        total_windows: stats.len(),
        total_obs,
        intraday_range: best.mean() - worst.mean(),
        morning_avg,
        afternoon_avg,
        swing,
        morning_dip: labels::morning_dip_strength(morning_avg),
        afternoon_rally: labels::afternoon_rally_strength(afternoon_avg),
        pattern_consistency: consistent.len(),
        viability: labels::viability(swing),
        risk_level: labels::risk_level(worst.mean()),
        position_size: labels::position_size(swing),
        data_quality: labels::data_quality(total_obs),
        best: best.into(),
        worst: worst.into(),
    })
}

/// Largest swing first; equal swings keep their input order.
pub fn rank_opportunities(mut opps: Vec<Opportunity>) -> Vec<Opportunity> {
    opps.sort_by(|a, b| b.swing.total_cmp(&a.swing));
    opps
}

/// Largest morning-to-afternoon swing first.
pub fn rank_summaries(mut rows: Vec<InstrumentSummary>) -> Vec<InstrumentSummary> {
    rows.sort_by(|a, b| b.swing.total_cmp(&a.swing));
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorConclusion {
    pub instruments: usize,
    pub avg_swing: f64,
    /// Instruments whose opportunity swing clears `viable_swing`.
    pub viable: usize,
    pub verdict: SectorVerdict,
}

pub fn sector_conclusion(opps: &[Opportunity], thresholds: &Thresholds) -> SectorConclusion {
    let swings: Vec<f64> = opps.iter().map(|o| o.swing).collect();
    let viable = swings.iter().filter(|&&s| s > thresholds.viable_swing).count();
    SectorConclusion {
        instruments: opps.len(),
        avg_swing: stats::mean(&swings).unwrap_or(0.0),
        viable,
        verdict: labels::sector_verdict(viable, opps.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{labels::Grade, stats::Summary};

    fn stat(symbol: &str, resolution: Resolution, window: &str, mean: f64, count: usize) -> WindowStat {
        let t = Thresholds::default();
        WindowStat {
            symbol: symbol.into(),
            resolution,
            window: window.into(),
            summary: Summary {
                count,
                mean,
                median: mean,
                std: 0.0,
                min: mean,
                max: mean,
                positive: if mean > 0.0 { count } else { 0 },
                negative: if mean < 0.0 { count } else { 0 },
            },
            win_rate: if mean > 0.0 { 100.0 } else { 0.0 },
            avg_volume: 0.0,
            volume_ratio: 0.0,
            volatility: labels::volatility_rank(0.0),
            strength: labels::pattern_strength(mean),
            signal: labels::trading_signal(mean, count, &t),
        }
    }

    fn instrument(ticker: &str) -> Instrument {
        Instrument::new(ticker, ticker, 1.0, 1000.0)
    }

    #[test]
    fn weighted_sector_mean() {
        let stats = [
            stat("A.AX", Resolution::FiveMinute, "11:00-11:15", 0.10, 50),
            stat("B.AX", Resolution::FiveMinute, "11:00-11:15", -0.05, 30),
            stat("C.AX", Resolution::FiveMinute, "11:00-11:15", 0.20, 20),
        ];
        let rows = sector_windows(&stats, &Thresholds::default());
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert!((row.weighted_mean - 0.075).abs() < 1e-12);
        assert_eq!(row.confirmations, 3);
        assert_eq!(row.total_obs, 100);
        assert_eq!(row.reliability, Grade::Medium);
        assert_eq!(row.strongest, "C.AX");
        assert_eq!(row.weakest, "B.AX");
        assert_eq!(row.pattern, SectorPattern::Rally);
    }

    #[test]
    fn resolutions_collapse_before_counting_confirmations() {
        let stats = [
            stat("A.AX", Resolution::FiveMinute, "10:00-10:15", 0.10, 10),
            stat("A.AX", Resolution::FifteenMinute, "10:00-10:15", 0.30, 10),
            stat("B.AX", Resolution::FiveMinute, "10:00-10:15", 0.10, 10),
        ];
        assert!(sector_windows(&stats, &Thresholds::default()).is_empty());

        let t = Thresholds {
            min_confirmations: 2,
            ..Thresholds::default()
        };
        let rows = sector_windows(&stats, &t);
        assert_eq!(rows[0].confirmations, 2);
        // A folds to 0.2 over 20 obs, B is 0.1 over 10
        assert!((rows[0].weighted_mean - 5.0 / 30.0).abs() < 1e-12);
        assert!((rows[0].std - 0.05).abs() < 1e-12);
    }

    #[test]
    fn sector_rows_sorted_and_timed() {
        let mut stats = Vec::new();
        for (w, m) in [("10:00-10:15", -0.2), ("12:00-12:15", 0.3), ("11:00-11:15", 0.0)] {
            for s in ["A.AX", "B.AX", "C.AX"] {
                stats.push(stat(s, Resolution::FiveMinute, w, m, 10));
            }
        }
        let rows = sector_windows(&stats, &Thresholds::default());
        let names: Vec<_> = rows.iter().map(|r| r.window.as_str()).collect();
        assert_eq!(names, ["12:00-12:15", "11:00-11:15", "10:00-10:15"]);
        let timing = sector_timing(&rows).unwrap();
        assert_eq!(timing.entry.window, "10:00-10:15");
        assert_eq!(timing.exit.window, "12:00-12:15");
        assert!((timing.swing - 0.5).abs() < 1e-12);
        assert!(sector_timing(&[]).is_none());
    }

    #[test]
    fn opportunity_spans_resolutions() {
        let stats = [
            stat("A.AX", Resolution::FiveMinute, "10:00-10:15", -0.2, 60),
            stat("A.AX", Resolution::SixtyMinute, "14:00-14:15", 0.3, 25),
            stat("A.AX", Resolution::FiveMinute, "12:00-12:15", 0.05, 40),
        ];
        let opp = opportunity(&instrument("A.AX"), &stats).unwrap();
        assert_eq!(opp.entry.window, "10:00-10:15");
        assert_eq!(opp.exit.window, "14:00-14:15");
        assert_eq!(opp.exit.resolution, Resolution::SixtyMinute);
        assert!((opp.swing - 0.5).abs() < 1e-12);
        assert_eq!(opp.quality, Quality::Good);
        assert_eq!(opp.confidence, Grade::High);
        assert!((opp.risk_reward - 1.5).abs() < 1e-12);
    }

    #[test]
    fn equal_means_give_zero_swing_and_first_seen_wins() {
        let stats = [
            stat("A.AX", Resolution::FiveMinute, "10:00-10:15", 0.1, 10),
            stat("A.AX", Resolution::FiveMinute, "10:15-10:30", 0.1, 10),
        ];
        let opp = opportunity(&instrument("A.AX"), &stats).unwrap();
        assert_eq!(opp.swing, 0.0);
        assert_eq!(opp.entry.window, "10:00-10:15");
        assert_eq!(opp.exit.window, "10:00-10:15");
        assert!(opportunity(&instrument("A.AX"), &[]).is_none());
    }

    #[test]
    fn morning_afternoon_buckets_are_weighted() {
        let buckets = DayBuckets::from_open_hour(10);
        let stats = [
            stat("A.AX", Resolution::FiveMinute, "10:00-10:15", -0.3, 10),
            stat("A.AX", Resolution::FiveMinute, "11:45-12:00", 0.0, 30),
            stat("A.AX", Resolution::FiveMinute, "12:15-12:30", 0.2, 10),
            stat("A.AX", Resolution::FiveMinute, "14:00-14:15", 0.9, 10),
        ];
        let row = instrument_summary(&instrument("A.AX"), &stats, &buckets).unwrap();
        assert!((row.morning_avg - (-0.075)).abs() < 1e-12);
        assert!((row.afternoon_avg - 0.2).abs() < 1e-12);
        assert!((row.swing - 0.275).abs() < 1e-12);
        assert_eq!(row.morning_dip, MoveStrength::Weak);
        assert_eq!(row.afternoon_rally, MoveStrength::Strong);
        assert_eq!(row.viability, Grade::Medium);
        assert_eq!(row.position_size, PositionSize::Five);
        assert_eq!(row.pattern_consistency, 3);
        assert_eq!(row.total_obs, 60);
        assert_eq!(row.data_quality, Quality::Fair);
        assert_eq!(row.risk_level, Grade::Medium);
    }

    #[test]
    fn buckets_shift_with_an_earlier_open() {
        let stats = [
            stat("A.AX", Resolution::FiveMinute, "09:30-09:45", -0.2, 10),
            stat("A.AX", Resolution::FiveMinute, "12:00-12:15", 0.3, 10),
        ];
        let row = instrument_summary(&instrument("A.AX"), &stats, &DayBuckets::from_open_hour(9)).unwrap();
        assert!((row.morning_avg + 0.2).abs() < 1e-12);
        // 12:00 is the fourth hour of a 09:30 session, still afternoon
        assert!((row.afternoon_avg - 0.3).abs() < 1e-12);
    }

    #[test]
    fn empty_buckets_average_zero() {
        let buckets = DayBuckets::from_open_hour(10);
        let stats = [stat("A.AX", Resolution::FiveMinute, "15:00-15:15", 0.4, 10)];
        let row = instrument_summary(&instrument("A.AX"), &stats, &buckets).unwrap();
        assert_eq!((row.morning_avg, row.afternoon_avg, row.swing), (0.0, 0.0, 0.0));
        assert_eq!(row.morning_dip, MoveStrength::None);
    }

    #[test]
    fn conclusion_and_ranking() {
        let mk = |t: &str, swing: f64| Opportunity {
            ticker: t.into(),
            name: t.into(),
            price: 1.0,
            entry: WindowPick {
                window: "10:00-10:15".into(),
                resolution: Resolution::FiveMinute,
                mean: -swing,
                observations: 10,
            },
            exit: WindowPick {
                window: "14:00-14:15".into(),
                resolution: Resolution::FiveMinute,
                mean: 0.0,
                observations: 10,
            },
            swing,
            quality: Quality::Fair,
            confidence: Grade::Medium,
            risk_reward: 0.0,
        };
        let ranked = rank_opportunities(vec![mk("A", 0.1), mk("B", 0.5), mk("C", 0.4)]);
        let order: Vec<_> = ranked.iter().map(|o| o.ticker.as_str()).collect();
        assert_eq!(order, ["B", "C", "A"]);

        let c = sector_conclusion(&ranked, &Thresholds::default());
        assert_eq!(c.viable, 2);
        assert_eq!(c.verdict, SectorVerdict::Viable);
        assert!((c.avg_swing - 1.0 / 3.0).abs() < 1e-12);

        let none = sector_conclusion(&[], &Thresholds::default());
        assert_eq!(none.verdict, SectorVerdict::NotViable);
    }
}
