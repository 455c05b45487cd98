//! The fixed set of intraday sampling resolutions the analysis runs over.

use std::fmt;

use market_data_ingestor::models::timeframe::TimeFrame;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1min", alias = "1m")]
    OneMinute,
    #[serde(rename = "5min", alias = "5m")]
    FiveMinute,
    #[serde(rename = "15min", alias = "15m")]
    FifteenMinute,
    #[serde(rename = "30min", alias = "30m")]
    ThirtyMinute,
    #[serde(rename = "1hour", alias = "1h", alias = "60min")]
    SixtyMinute,
}

impl Resolution {
    pub const ALL: [Resolution; 5] = [
        Resolution::OneMinute,
        Resolution::FiveMinute,
        Resolution::FifteenMinute,
        Resolution::ThirtyMinute,
        Resolution::SixtyMinute,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Resolution::OneMinute => "1min",
            Resolution::FiveMinute => "5min",
            Resolution::FifteenMinute => "15min",
            Resolution::ThirtyMinute => "30min",
            Resolution::SixtyMinute => "1hour",
        }
    }

    pub const fn timeframe(self) -> TimeFrame {
        match self {
            Resolution::OneMinute => TimeFrame::minutes(1),
            Resolution::FiveMinute => TimeFrame::minutes(5),
            Resolution::FifteenMinute => TimeFrame::minutes(15),
            Resolution::ThirtyMinute => TimeFrame::minutes(30),
            Resolution::SixtyMinute => TimeFrame::hour(),
        }
    }

    /// How far back the chart API serves each interval.
    pub const fn default_lookback_days(self) -> u32 {
        match self {
            Resolution::OneMinute => 7,
            Resolution::FiveMinute | Resolution::FifteenMinute | Resolution::ThirtyMinute => 60,
            Resolution::SixtyMinute => 730,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_config_names() {
        let names: Vec<&str> = Resolution::ALL.iter().map(|r| r.label()).collect();
        assert_eq!(names, ["1min", "5min", "15min", "30min", "1hour"]);
        assert_eq!(Resolution::ThirtyMinute.to_string(), "30min");
    }

    #[test]
    fn timeframes_match_interval() {
        assert_eq!(Resolution::FiveMinute.timeframe().to_string(), "5m");
        assert_eq!(Resolution::SixtyMinute.timeframe().to_string(), "1h");
        assert_eq!(Resolution::OneMinute.default_lookback_days(), 7);
    }
}
