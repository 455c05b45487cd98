#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use market_data_ingestor::{
    models::{bar::Bar, bar_series::BarSeries, request_params::BarsRequestParams, timeframe::TimeFrame},
    providers::{ApiSnafu, DataProvider, ProviderError},
};

/// `days` weekdays of 5-minute bars, 10:00-15:55 AWST from Monday
/// 2025-03-03. Price dips through the morning, jumps at noon and drifts up.
/// `tilt` scales the afternoon drift so instruments differ.
pub fn intraday(symbol: &str, days: i64, tilt: f64) -> BarSeries {
    let first = Utc.with_ymd_and_hms(2025, 3, 3, 2, 0, 0).unwrap();
    let mut bars = Vec::new();
    for d in 0..days {
        let start = first + Duration::days(d + 2 * (d / 5));
        for i in 0..72i64 {
            let close = if i < 24 {
                10.0 - 0.01 * i as f64
            } else {
                10.0 + tilt * 0.005 * i as f64
            };
            bars.push(Bar {
                timestamp: start + Duration::minutes(5 * i),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0 + i as f64,
            });
        }
    }
    BarSeries::new(symbol, TimeFrame::minutes(5), bars)
}

/// Serves daily quotes and 5-minute history from memory.
#[derive(Default)]
pub struct StubProvider {
    pub prices: HashMap<String, f64>,
    pub tilts: HashMap<String, f64>,
    /// Symbols whose intraday requests fail.
    pub failing: HashSet<String>,
    /// Symbols whose intraday requests panic inside the worker.
    pub panicking: HashSet<String>,
    pub days: i64,
    pub calls: AtomicUsize,
}

impl StubProvider {
    pub fn with(symbols: &[(&str, f64, f64)], days: i64) -> Self {
        Self {
            prices: symbols.iter().map(|(s, p, _)| (s.to_string(), *p)).collect(),
            tilts: symbols.iter().map(|(s, _, t)| (s.to_string(), *t)).collect(),
            days,
            ..Self::default()
        }
    }
}

#[async_trait]
impl DataProvider for StubProvider {
    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<Vec<BarSeries>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut out = Vec::new();
        for symbol in &params.symbols {
            if params.timeframe == TimeFrame::day() {
                if let Some(&price) = self.prices.get(symbol) {
                    let bar = Bar {
                        timestamp: params.end - Duration::days(1),
                        open: price,
                        high: price,
                        low: price,
                        close: price,
                        volume: 5e5,
                    };
                    out.push(BarSeries::new(symbol.as_str(), TimeFrame::day(), vec![bar]));
                }
                continue;
            }
            if self.failing.contains(symbol) {
                return ApiSnafu {
                    message: format!("no data for {symbol}"),
                }
                .fail();
            }
            if self.panicking.contains(symbol) {
                panic!("stub provider blew up on {symbol}");
            }
            if params.timeframe == TimeFrame::minutes(5) {
                let tilt = self.tilts.get(symbol).copied().unwrap_or(1.0);
                out.push(intraday(symbol, self.days, tilt));
            }
        }
        Ok(out)
    }
}
