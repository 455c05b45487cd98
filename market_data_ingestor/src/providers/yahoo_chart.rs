//! Yahoo Finance chart API (`/v8/finance/chart/{symbol}`).
//!
//! The endpoint returns parallel arrays (timestamps plus one array per OHLCV
//! field) with `null` holes where the exchange printed nothing. Holes are
//! skipped rather than filled.

pub mod params;
pub mod provider;
pub mod response;

pub use provider::YahooChartProvider;
