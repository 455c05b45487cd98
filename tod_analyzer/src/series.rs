//! Bars after time normalization: naive exchange wall-clock stamps.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::resolution::Resolution;

#[derive(Debug, Clone, PartialEq)]
pub struct LocalBar {
    /// Exchange-local wall-clock time, offset stripped.
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl LocalBar {
    pub fn date(&self) -> NaiveDate {
        self.time.date()
    }

    pub fn hour_minute(&self) -> (u32, u32) {
        (self.time.hour(), self.time.minute())
    }
}

/// Trading-hours bars of one instrument at one resolution, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub symbol: String,
    pub resolution: Resolution,
    pub bars: Vec<LocalBar>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
