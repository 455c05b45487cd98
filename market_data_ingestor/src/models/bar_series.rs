//! Bars of one symbol at one timeframe.

use crate::models::{bar::Bar, timeframe::TimeFrame};

/// Self-describing history for a single symbol: who, at what bar width, and
/// the bars themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    /// Vendor ticker, e.g. "BHP.AX".
    pub symbol: String,
    pub timeframe: TimeFrame,
    /// Oldest first once [`BarSeries::sort`] ran.
    pub bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>, timeframe: TimeFrame, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            bars,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Sorts bars by timestamp (stable) and drops exact duplicate stamps,
    /// keeping the first occurrence.
    pub fn sort(&mut self) {
        self.bars.sort_by_key(|b| b.timestamp);
        self.bars.dedup_by_key(|b| b.timestamp);
    }
}
