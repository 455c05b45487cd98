//! Universe screening: which configured tickers are worth analyzing.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use market_data_ingestor::models::{request_params::BarsRequestParams, timeframe::TimeFrame};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    config::UniverseCfg,
    pipeline::{SharedProvider, run_bounded},
    stats::mean,
};

/// A screened instrument. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instrument {
    pub ticker: String,
    pub name: String,
    /// Last daily close.
    pub price: f64,
    /// Mean daily volume over the screening lookback.
    pub avg_volume: f64,
}

impl Instrument {
    pub fn new(ticker: impl Into<String>, name: impl Into<String>, price: f64, avg_volume: f64) -> Self {
        Self {
            ticker: ticker.into(),
            name: name.into(),
            price,
            avg_volume,
        }
    }

    /// Ticker without the exchange suffix, e.g. `BHP` for `BHP.AX`.
    pub fn short_ticker(&self) -> &str {
        self.ticker.split('.').next().unwrap_or(&self.ticker)
    }
}

/// Fetch recent daily bars for every ticker and keep those priced above
/// `cfg.min_price`. Tickers with no quote or a failed fetch are dropped with
/// a log line. Survivors keep universe order.
pub async fn screen(
    provider: SharedProvider,
    universe: &IndexMap<String, String>,
    cfg: &UniverseCfg,
    concurrency: usize,
    now: DateTime<Utc>,
) -> Vec<Instrument> {
    info!(tickers = universe.len(), min_price = cfg.min_price, "screening universe");
    let jobs: Vec<(String, String)> = universe
        .iter()
        .map(|(t, n)| (t.clone(), n.clone()))
        .collect();
    let min_price = cfg.min_price;
    let days = cfg.screen_days;

    let screened = run_bounded(jobs, concurrency, move |(ticker, name)| {
        let provider = provider.clone();
        async move {
            let params = BarsRequestParams::lookback(ticker.clone(), TimeFrame::day(), days, now);
            let series = match provider.fetch_bars(params).await {
                Ok(series) => series,
                Err(err) => {
                    warn!(ticker = %ticker, error = %err, "screening fetch failed");
                    return None;
                }
            };
            let bars = series.into_iter().find(|s| s.symbol == ticker)?.bars;
            let Some(last) = bars.last() else {
                debug!(ticker = %ticker, "no recent quote");
                return None;
            };
            let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
            let instrument = Instrument::new(
                ticker.clone(),
                name,
                last.close,
                mean(&volumes).unwrap_or(0.0),
            );
            if instrument.price > min_price {
                Some(instrument)
            } else {
                debug!(ticker = %ticker, price = instrument.price, "below minimum price");
                None
            }
        }
    })
    .await;

    info!(valid = screened.len(), "screening done");
    screened
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_ticker_strips_exchange() {
        let i = Instrument::new("PLS.AX", "Pilbara Minerals", 2.5, 1e6);
        assert_eq!(i.short_ticker(), "PLS");
        let bare = Instrument::new("BHP", "BHP", 40.0, 1e6);
        assert_eq!(bare.short_ticker(), "BHP");
    }
}
