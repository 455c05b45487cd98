//! Vendor-agnostic OHLCV bar model and the providers that fill it.
//!
//! Every provider hands back [`models::bar_series::BarSeries`] values whose
//! timestamps are UTC instants; converting them to an exchange's wall clock is
//! left to the consumer.

pub mod models;
pub mod providers;
pub mod time;
