//! Exchange session and the time normalizer.
//!
//! Raw bars arrive as UTC instants. [`normalize`] converts them to the
//! exchange's wall clock (AWST, `Australia/Perth`, by default), strips the
//! offset, and keeps only bars that fall on a weekday inside the session's
//! hour range. The hour range is inclusive at both ends: with a 10:00 open and
//! a 15:15 close every bar stamped 10:00 through 15:59 survives, because the
//! close hour is the session's last partial hour.
//!
//! There is no holiday calendar. Market holidays that fall on weekdays simply
//! produce no bars, which is indistinguishable from any other gap.

use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use market_data_ingestor::models::bar_series::BarSeries;
use thiserror::Error;
use tracing::debug;

use crate::{
    resolution::Resolution,
    series::{LocalBar, Series},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("bad timezone: {0}")]
    Timezone(String),

    #[error("bad session time {0:?} (expected HH:MM)")]
    Time(String),

    #[error("session open {open} must be before close {close}")]
    Inverted { open: NaiveTime, close: NaiveTime },

    #[error("window width must be between 1 and 60 minutes, got {0}")]
    WindowWidth(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Session {
    pub tz: Tz,
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub window_minutes: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            tz: chrono_tz::Australia::Perth,
            open: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(15, 15, 0).unwrap_or(NaiveTime::MIN),
            window_minutes: 15,
        }
    }
}

impl Session {
    pub fn new(
        tz_name: &str,
        open: &str,
        close: &str,
        window_minutes: u32,
    ) -> Result<Self, SessionError> {
        let tz: Tz = tz_name
            .parse()
            .map_err(|_| SessionError::Timezone(tz_name.to_string()))?;
        let open = parse_hhmm(open)?;
        let close = parse_hhmm(close)?;
        if open >= close {
            return Err(SessionError::Inverted { open, close });
        }
        if !(1..=60).contains(&window_minutes) {
            return Err(SessionError::WindowWidth(window_minutes));
        }
        Ok(Self {
            tz,
            open,
            close,
            window_minutes,
        })
    }

    /// UTC instant -> exchange wall clock, offset stripped.
    pub fn to_local(&self, ts: DateTime<Utc>) -> NaiveDateTime {
        ts.with_timezone(&self.tz).naive_local()
    }

    pub fn open_hour(&self) -> u32 {
        self.open.hour()
    }

    pub fn close_hour(&self) -> u32 {
        self.close.hour()
    }

    /// Weekday and inside the inclusive session hour range.
    pub fn is_trading_time(&self, t: NaiveDateTime) -> bool {
        let weekday = !matches!(t.weekday(), Weekday::Sat | Weekday::Sun);
        weekday && (self.open_hour()..=self.close_hour()).contains(&t.hour())
    }
}

/// Window start hours that make up the morning and afternoon buckets of the
/// executive summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBuckets {
    pub morning: Vec<u32>,
    pub afternoon: Vec<u32>,
}

impl DayBuckets {
    /// First two session hours, then the next two.
    pub fn from_open_hour(open_hour: u32) -> Self {
        Self {
            morning: vec![open_hour, open_hour + 1],
            afternoon: vec![open_hour + 2, open_hour + 3],
        }
    }
}

fn parse_hhmm(s: &str) -> Result<NaiveTime, SessionError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| SessionError::Time(s.to_string()))
}

/// Convert one raw series to session-local trading-hours bars.
///
/// Returns `None` (and logs at debug) when fewer than `min_bars` bars survive;
/// a resolution without enough data is skipped, never reported as an error.
pub fn normalize(
    raw: &BarSeries,
    resolution: Resolution,
    session: &Session,
    min_bars: usize,
) -> Option<Series> {
    let mut bars: Vec<LocalBar> = raw
        .bars
        .iter()
        .filter(|b| b.is_valid())
        .map(|b| LocalBar {
            time: session.to_local(b.timestamp),
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume,
        })
        .filter(|b| session.is_trading_time(b.time))
        .collect();
    bars.sort_by_key(|b| b.time);
    bars.dedup_by_key(|b| b.time);

    if bars.len() < min_bars {
        debug!(
            symbol = %raw.symbol,
            resolution = %resolution,
            bars = bars.len(),
            min_bars,
            "resolution unusable"
        );
        return None;
    }

    Some(Series {
        symbol: raw.symbol.clone(),
        resolution,
        bars,
    })
}
