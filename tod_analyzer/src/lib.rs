//! Time-of-day intraday pattern analysis for a universe of exchange-listed
//! instruments.
//!
//! Bars flow through the crate in one direction:
//! [`session`] normalizes raw UTC bars to exchange wall-clock trading hours,
//! [`window`] buckets them into clock-time windows, [`stats`] computes
//! per-window return statistics, [`aggregate`] ranks windows across the
//! sector and per instrument, and [`backtest`] replays the resulting
//! buy/sell windows day by day. [`pipeline`] runs all of it per instrument on
//! a bounded worker pool and hands the caller an [`pipeline::AnalysisRun`].

pub mod aggregate;
pub mod backtest;
pub mod config;
pub mod labels;
pub mod pipeline;
pub mod report;
pub mod resolution;
pub mod series;
pub mod session;
pub mod stats;
pub mod summary;
pub mod universe;
pub mod window;
