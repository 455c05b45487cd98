//! Bar interval = amount × unit (e.g. 5-Minute, 1-Hour, 1-Day).
//!
//! Display uses the compact form `"5m"`, `"1h"`, `"1D"`, which is also what
//! file names of the CSV provider carry.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeFrameUnit {
    Minute,
    Hour,
    Day,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeFrame {
    pub amount: u32,
    pub unit: TimeFrameUnit,
}

impl TimeFrame {
    /// Minute bars; amounts are clamped to 1-59.
    pub const fn minutes(amount: u32) -> Self {
        let amount = if amount == 0 {
            1
        } else if amount > 59 {
            59
        } else {
            amount
        };
        Self {
            amount,
            unit: TimeFrameUnit::Minute,
        }
    }

    pub const fn hour() -> Self {
        Self {
            amount: 1,
            unit: TimeFrameUnit::Hour,
        }
    }

    pub const fn day() -> Self {
        Self {
            amount: 1,
            unit: TimeFrameUnit::Day,
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let u = match self.unit {
            TimeFrameUnit::Minute => "m",
            TimeFrameUnit::Hour => "h",
            TimeFrameUnit::Day => "D",
        };
        write!(f, "{}{u}", self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minute_amounts_are_clamped() {
        assert_eq!(TimeFrame::minutes(0).amount, 1);
        assert_eq!(TimeFrame::minutes(5).amount, 5);
        assert_eq!(TimeFrame::minutes(90).amount, 59);
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(TimeFrame::minutes(15).to_string(), "15m");
        assert_eq!(TimeFrame::hour().to_string(), "1h");
        assert_eq!(TimeFrame::day().to_string(), "1D");
    }
}
