//! Bar sources.
//!
//! Two implementations ship with the crate: [`yahoo_chart`] pulls history from
//! the public chart endpoint and [`csv_dir`] replays `<SYMBOL>_<timeframe>.csv`
//! files from disk. Consumers hold them as `Arc<dyn DataProvider + Send + Sync>`
//! so the source can be chosen at startup or replaced by a stub in tests.
//!
//! ```rust
//! use async_trait::async_trait;
//! use market_data_ingestor::models::{bar_series::BarSeries, request_params::BarsRequestParams};
//! use market_data_ingestor::providers::{DataProvider, ProviderError};
//!
//! struct Empty;
//!
//! #[async_trait]
//! impl DataProvider for Empty {
//!     async fn fetch_bars(&self, _: BarsRequestParams) -> Result<Vec<BarSeries>, ProviderError> {
//!         Ok(vec![])
//!     }
//! }
//! ```

pub mod csv_dir;
pub mod yahoo_chart;

use async_trait::async_trait;
use snafu::{Backtrace, Snafu};

use crate::models::{bar_series::BarSeries, request_params::BarsRequestParams};

/// Source of OHLCV history.
#[async_trait]
pub trait DataProvider {
    /// At most one series per requested symbol, bars oldest first. A symbol
    /// without data may be absent or come back empty; callers treat both the
    /// same way.
    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<Vec<BarSeries>, ProviderError>;
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The user agent is not a valid header value.
    #[snafu(display("Invalid user agent: {source}"))]
    InvalidHeader {
        source: reqwest::header::InvalidHeaderValue,
        backtrace: Backtrace,
    },

    #[snafu(display("Data directory not found: {path}"))]
    MissingDataDir { path: String, backtrace: Backtrace },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// Transport failure or an undecodable body.
    #[snafu(display("Chart request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The source answered, but with an error for this symbol.
    #[snafu(display("Source error: {message}"))]
    Api {
        message: String,
        backtrace: Backtrace,
    },

    /// The request cannot be expressed for this source (range, interval).
    #[snafu(display("Unsupported request: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    #[snafu(display("Failed to read {path}: {source}"))]
    Read {
        path: String,
        source: csv::Error,
        backtrace: Backtrace,
    },
}
