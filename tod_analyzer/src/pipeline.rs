//! Per-instrument pipeline and the bounded worker pool that runs it.
//!
//! One task per instrument: fetch every configured resolution, normalize,
//! compute window statistics, pick the opportunity, backtest. Tasks share
//! nothing mutable; results are merged only after all of them finish and are
//! put back into universe order, so a run's output does not depend on task
//! completion order.

use std::{future::Future, sync::Arc};

use chrono::{DateTime, Utc};
use market_data_ingestor::{
    models::{bar_series::BarSeries, request_params::BarsRequestParams},
    providers::DataProvider,
};
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, info, warn};

use crate::{
    aggregate::{self, InstrumentSummary, Opportunity, SectorConclusion, SectorTiming, SectorWindow},
    backtest::{self, BacktestReport, BacktestSummary},
    config::{AnalysisConfig, WindowSource},
    resolution::Resolution,
    series::Series,
    session::{self, Session},
    stats::{self, WindowStat},
    universe::Instrument,
    window::{Window, WindowSet},
};

pub type SharedProvider = Arc<dyn DataProvider + Send + Sync>;

/// Run `job` over `items` with at most `concurrency` in flight. `None`
/// results and panicked tasks are dropped; the rest come back in input order.
pub(crate) async fn run_bounded<I, T, F, Fut>(items: Vec<I>, concurrency: usize, job: F) -> Vec<T>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Option<T>> + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();
    for (idx, item) in items.into_iter().enumerate() {
        let permits = permits.clone();
        let fut = job(item);
        set.spawn(async move {
            let _permit = permits.acquire_owned().await.ok()?;
            fut.await.map(|out| (idx, out))
        });
    }

    let mut done = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Some(pair)) => done.push(pair),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "worker task failed"),
        }
    }
    done.sort_by_key(|(idx, _)| *idx);
    done.into_iter().map(|(_, out)| out).collect()
}

/// Everything computed for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentAnalysis {
    pub instrument: Instrument,
    /// Resolutions that had enough bars, in fetch order.
    pub resolutions: Vec<Resolution>,
    /// All resolutions, window order within each.
    pub stats: Vec<WindowStat>,
    pub opportunity: Option<Opportunity>,
    pub summary: Option<InstrumentSummary>,
    pub backtest: Option<BacktestSummary>,
}

/// Buy/sell windows for the backtest under the configured source.
fn backtest_windows(
    series: &Series,
    stats: &[WindowStat],
    session: &Session,
    cfg: &AnalysisConfig,
) -> Option<(Window, Window)> {
    match cfg.backtest.window_source {
        WindowSource::Session => {
            let (best, worst) = aggregate::best_and_worst(stats)?;
            Some((Window::parse(&worst.window).ok()?, Window::parse(&best.window).ok()?))
        }
        WindowSource::Slots => {
            let obs = stats::observations(series, cfg.thresholds.outlier_pct);
            let slots = backtest::slots(
                session.open_hour(),
                session.close_hour(),
                cfg.backtest.slot_minutes,
            );
            let (exit, entry) = backtest::best_worst_slots(&obs, &slots, cfg.backtest.min_slot_obs)?;
            Some((entry, exit))
        }
    }
}

/// Pure analysis of one instrument's fetched series. `None` when no
/// resolution has enough bars.
pub fn analyze_instrument(
    instrument: &Instrument,
    raw: &[(Resolution, BarSeries)],
    cfg: &AnalysisConfig,
    session: &Session,
    windows: &WindowSet,
) -> Option<InstrumentAnalysis> {
    let normalized: Vec<_> = raw
        .iter()
        .filter_map(|(res, bars)| session::normalize(bars, *res, session, cfg.thresholds.min_bars))
        .collect();
    if normalized.is_empty() {
        debug!(ticker = %instrument.ticker, "no usable resolution");
        return None;
    }

    let stats: Vec<WindowStat> = normalized
        .iter()
        .flat_map(|s| stats::analyze_series(s, windows, &cfg.thresholds))
        .collect();

    let backtest = normalized
        .iter()
        .find(|s| s.resolution == cfg.backtest.resolution)
        .and_then(|s| {
            let (entry, exit) = backtest_windows(s, &stats, session, cfg)?;
            backtest::run(&instrument.ticker, s, &entry, &exit)
        });

    Some(InstrumentAnalysis {
        instrument: instrument.clone(),
        resolutions: normalized.iter().map(|s| s.resolution).collect(),
        opportunity: aggregate::opportunity(instrument, &stats),
        summary: aggregate::instrument_summary(instrument, &stats, &cfg.day_buckets(session)),
        backtest,
        stats,
    })
}

/// Fetch every configured resolution for `ticker`. A failed resolution is
/// logged and skipped; the others still count.
async fn fetch_all(
    provider: &SharedProvider,
    ticker: &str,
    cfg: &AnalysisConfig,
    now: DateTime<Utc>,
) -> Vec<(Resolution, BarSeries)> {
    let mut out = Vec::new();
    for rc in &cfg.fetch.resolutions {
        let params = BarsRequestParams::lookback(ticker, rc.interval.timeframe(), rc.lookback_days, now);
        match provider.fetch_bars(params).await {
            Ok(series) => {
                if let Some(s) = series.into_iter().find(|s| s.symbol == ticker && !s.is_empty()) {
                    out.push((rc.interval, s));
                }
            }
            Err(err) => {
                warn!(ticker, resolution = %rc.interval, error = %err, "fetch failed");
            }
        }
    }
    out
}

/// Results of one run, owned by the caller. Every table is derived from the
/// merged per-instrument analyses, in universe order.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRun {
    pub started_at: DateTime<Utc>,
    pub screened: usize,
    pub analyses: Vec<InstrumentAnalysis>,
    pub sector: Vec<SectorWindow>,
    pub timing: Option<SectorTiming>,
    /// Largest swing first.
    pub opportunities: Vec<Opportunity>,
    /// Largest morning/afternoon swing first.
    pub summaries: Vec<InstrumentSummary>,
    pub conclusion: SectorConclusion,
    pub backtest: BacktestReport,
}

impl AnalysisRun {
    pub fn from_analyses(
        analyses: Vec<InstrumentAnalysis>,
        screened: usize,
        cfg: &AnalysisConfig,
        started_at: DateTime<Utc>,
    ) -> Self {
        let sector = aggregate::sector_windows(
            analyses.iter().flat_map(|a| a.stats.iter()),
            &cfg.thresholds,
        );
        let opportunities =
            aggregate::rank_opportunities(analyses.iter().filter_map(|a| a.opportunity.clone()).collect());
        let summaries =
            aggregate::rank_summaries(analyses.iter().filter_map(|a| a.summary.clone()).collect());
        let conclusion = aggregate::sector_conclusion(&opportunities, &cfg.thresholds);
        let backtest = BacktestReport::from_summaries(analyses.iter().filter_map(|a| a.backtest.as_ref()));
        Self {
            started_at,
            screened,
            timing: aggregate::sector_timing(&sector),
            sector,
            opportunities,
            summaries,
            conclusion,
            backtest,
            analyses,
        }
    }

    pub fn window_stats(&self) -> impl Iterator<Item = &WindowStat> {
        self.analyses.iter().flat_map(|a| a.stats.iter())
    }

    pub fn backtests(&self) -> impl Iterator<Item = &BacktestSummary> {
        self.analyses.iter().filter_map(|a| a.backtest.as_ref())
    }

    pub fn total_observations(&self) -> usize {
        self.window_stats().map(WindowStat::count).sum()
    }
}

/// Run every instrument through the pipeline on a bounded pool and merge.
pub async fn run_universe(
    provider: SharedProvider,
    instruments: Vec<Instrument>,
    cfg: &AnalysisConfig,
    now: DateTime<Utc>,
) -> anyhow::Result<AnalysisRun> {
    let session = cfg.session()?;
    let windows = cfg.window_set(&session);
    let screened = instruments.len();
    info!(
        instruments = screened,
        windows = windows.len(),
        concurrency = cfg.fetch.concurrency,
        "analyzing universe"
    );

    let shared = Arc::new((cfg.clone(), session, windows));
    let analyses = run_bounded(instruments, cfg.fetch.concurrency, |instrument| {
        let provider = provider.clone();
        let shared = shared.clone();
        async move {
            let raw = fetch_all(&provider, &instrument.ticker, &shared.0, now).await;
            let ticker = instrument.ticker.clone();
            // statistics are CPU-bound; keep them off the runtime's workers
            let analysis = tokio::task::spawn_blocking(move || {
                let (cfg, session, windows) = &*shared;
                analyze_instrument(&instrument, &raw, cfg, session, windows)
            })
            .await;
            match analysis {
                Ok(Some(a)) => {
                    info!(
                        ticker = %ticker,
                        windows = a.stats.len(),
                        resolutions = a.resolutions.len(),
                        "analyzed"
                    );
                    Some(a)
                }
                Ok(None) => {
                    warn!(ticker = %ticker, "no usable data");
                    None
                }
                Err(err) => {
                    warn!(ticker = %ticker, error = %err, "analysis task failed");
                    None
                }
            }
        }
    })
    .await;

    info!(analyzed = analyses.len(), screened, "universe done");
    Ok(AnalysisRun::from_analyses(analyses, screened, cfg, now))
}
