//! The OHLCV bar every [`DataProvider`](crate::providers::DataProvider) returns,
//! whichever vendor or file format it read.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// The instant this bar was stamped with, in UTC.
    pub timestamp: DateTime<Utc>,

    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Shares traded in the interval; some sources report 0 for thin bars.
    pub volume: f64,
}

impl Bar {
    /// A bar is usable when every price is finite and the close is positive.
    pub fn is_valid(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
            && self.close > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(close: f64, volume: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2025, 3, 3, 2, 5, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    #[test]
    fn rejects_non_positive_close_and_nan() {
        assert!(bar(1.25, 100.0).is_valid());
        assert!(!bar(0.0, 100.0).is_valid());
        assert!(!bar(f64::NAN, 100.0).is_valid());
        assert!(!bar(1.0, f64::INFINITY).is_valid());
    }
}
