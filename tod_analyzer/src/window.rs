//! Clock-time windows and the bucketing rule that assigns bars to them.
//!
//! A window is named `HH:MM-HH:MM`. Membership is decided on the bar's
//! (hour, minute) alone:
//!
//! * same-hour window: `start_m < minute <= end_m`
//! * hour-spanning window: `(hour == start_h && minute > start_m) || (hour == end_h && minute <= end_m)`
//!
//! so a boundary bar belongs to the window that *ends* on it. The window that
//! starts at the session open is additionally closed at its start, otherwise
//! the opening bar would fall into no window at all.

use std::{fmt, str::FromStr};

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;
use tracing::warn;

use crate::session::Session;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowParseError {
    #[error("window {0:?} is not of the form HH:MM-HH:MM")]
    Shape(String),

    #[error("window {name:?}: invalid clock time {part:?}")]
    ClockTime { name: String, part: String },

    #[error("window {0:?} ends before it starts")]
    Inverted(String),
}

/// Hour and minute on the exchange wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
}

impl ClockTime {
    pub const fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    pub fn from_minutes(total: u32) -> Self {
        Self::new(total / 60, total % 60)
    }

    pub fn of(t: NaiveTime) -> Self {
        Self::new(t.hour(), t.minute())
    }

    pub fn total_minutes(self) -> u32 {
        self.hour * 60 + self.minute
    }

    pub fn to_naive(self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0)
    }

    /// Parses `HH:MM`; `HH:60` is accepted and rolled into the next hour.
    fn parse(part: &str) -> Option<Self> {
        let (h, m) = part.trim().split_once(':')?;
        let hour: u32 = h.parse().ok()?;
        let minute: u32 = m.parse().ok()?;
        if hour > 24 || minute > 60 {
            return None;
        }
        let t = Self::from_minutes(hour * 60 + minute);
        (t.hour < 24 || t.total_minutes() == 24 * 60).then_some(t)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl Window {
    pub fn new(start: ClockTime, end: ClockTime) -> Self {
        Self { start, end }
    }

    pub fn parse(name: &str) -> Result<Self, WindowParseError> {
        let (a, b) = name
            .split_once('-')
            .ok_or_else(|| WindowParseError::Shape(name.to_string()))?;
        let clock = |part: &str| {
            ClockTime::parse(part).ok_or_else(|| WindowParseError::ClockTime {
                name: name.to_string(),
                part: part.to_string(),
            })
        };
        let start = clock(a)?;
        let end = clock(b)?;
        if end <= start {
            return Err(WindowParseError::Inverted(name.to_string()));
        }
        Ok(Self { start, end })
    }

    pub fn name(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }

    /// The boundary a trade executes at: the window's end on the wall clock.
    pub fn end_time(&self) -> Option<NaiveTime> {
        self.end.to_naive()
    }

    pub fn start_hour(&self) -> u32 {
        self.start.hour
    }

    /// Membership by (hour, minute). `closed_start` also admits the start
    /// minute itself; only the session's opening window sets it.
    pub fn contains(&self, hour: u32, minute: u32, closed_start: bool) -> bool {
        let (sh, sm) = (self.start.hour, self.start.minute);
        let (eh, em) = (self.end.hour, self.end.minute);
        if closed_start && hour == sh && minute == sm {
            return true;
        }
        if sh == eh {
            hour == sh && minute > sm && minute <= em
        } else {
            (hour == sh && minute > sm) || (hour == eh && minute <= em)
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for Window {
    type Err = WindowParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Boolean membership mask of `times` for the window called `name`.
///
/// A malformed name is a data-quality problem, not a failure: it logs a
/// warning and selects nothing.
pub fn window_mask(name: &str, times: &[NaiveDateTime], session_open: NaiveTime) -> Vec<bool> {
    match Window::parse(name) {
        Ok(w) => {
            let closed = w.start == ClockTime::of(session_open);
            times
                .iter()
                .map(|t| w.contains(t.hour(), t.minute(), closed))
                .collect()
        }
        Err(err) => {
            warn!(window = name, error = %err, "malformed window, selecting nothing");
            vec![false; times.len()]
        }
    }
}

/// Ordered, non-overlapping windows covering one session.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSet {
    windows: Vec<Window>,
    open: ClockTime,
}

impl WindowSet {
    /// Consecutive `window_minutes` windows from open to close; the last one
    /// is clipped to the close.
    pub fn for_session(session: &Session) -> Self {
        let open = ClockTime::of(session.open);
        let close = ClockTime::of(session.close).total_minutes();
        let step = session.window_minutes.max(1);
        let mut windows = Vec::new();
        let mut start = open.total_minutes();
        while start < close {
            let end = (start + step).min(close);
            windows.push(Window::new(
                ClockTime::from_minutes(start),
                ClockTime::from_minutes(end),
            ));
            start = end;
        }
        Self { windows, open }
    }

    /// Explicit window list. Malformed names are logged and skipped.
    pub fn from_names<S: AsRef<str>>(names: &[S], session: &Session) -> Self {
        let windows = names
            .iter()
            .filter_map(|n| match Window::parse(n.as_ref()) {
                Ok(w) => Some(w),
                Err(err) => {
                    warn!(window = n.as_ref(), error = %err, "skipping malformed window");
                    None
                }
            })
            .collect();
        Self {
            windows,
            open: ClockTime::of(session.open),
        }
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    fn closed_start(&self, w: &Window) -> bool {
        w.start == self.open
    }

    /// Index of the window `t` falls in, if any. First match wins.
    pub fn assign(&self, t: NaiveDateTime) -> Option<usize> {
        let (h, m) = (t.hour(), t.minute());
        self.windows
            .iter()
            .position(|w| w.contains(h, m, self.closed_start(w)))
    }

    pub fn mask(&self, index: usize, times: &[NaiveDateTime]) -> Vec<bool> {
        match self.windows.get(index) {
            Some(w) => {
                let closed = self.closed_start(w);
                times
                    .iter()
                    .map(|t| w.contains(t.hour(), t.minute(), closed))
                    .collect()
            }
            None => vec![false; times.len()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn open() -> NaiveTime {
        NaiveTime::from_hms_opt(10, 0, 0).unwrap()
    }

    #[test]
    fn default_session_has_21_windows() {
        let set = WindowSet::for_session(&Session::default());
        assert_eq!(set.len(), 21);
        assert_eq!(set.windows()[0].name(), "10:00-10:15");
        assert_eq!(set.windows()[3].name(), "10:45-11:00");
        assert_eq!(set.windows()[20].name(), "15:00-15:15");
    }

    #[test]
    fn parse_accepts_minute_sixty() {
        let w = Window::parse("10:45-10:60").unwrap();
        assert_eq!(w.name(), "10:45-11:00");
        assert_eq!(w.end_time(), NaiveTime::from_hms_opt(11, 0, 0));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(Window::parse("1000-1015"), Err(WindowParseError::Shape(_))));
        assert!(matches!(
            Window::parse("10:00-xx:15"),
            Err(WindowParseError::ClockTime { .. })
        ));
        assert!(matches!(
            Window::parse("11:00-10:45"),
            Err(WindowParseError::Inverted(_))
        ));
    }

    #[test]
    fn boundary_bar_belongs_to_window_ending_on_it() {
        let set = WindowSet::for_session(&Session::default());
        let names = |t| set.assign(t).map(|i| set.windows()[i].name());
        assert_eq!(names(at(10, 0)).as_deref(), Some("10:00-10:15"));
        assert_eq!(names(at(10, 15)).as_deref(), Some("10:00-10:15"));
        assert_eq!(names(at(10, 16)).as_deref(), Some("10:15-10:30"));
        assert_eq!(names(at(10, 20)).as_deref(), Some("10:15-10:30"));
        assert_eq!(names(at(11, 0)).as_deref(), Some("10:45-11:00"));
        assert_eq!(names(at(15, 15)).as_deref(), Some("15:00-15:15"));
        assert_eq!(names(at(15, 20)), None);
    }

    #[test]
    fn hour_spanning_rule() {
        let w = Window::parse("10:45-11:00").unwrap();
        assert!(w.contains(10, 50, false));
        assert!(w.contains(11, 0, false));
        assert!(!w.contains(10, 45, false));
        assert!(!w.contains(11, 5, false));
    }

    #[test]
    fn only_opening_window_is_closed_at_start() {
        let times = [at(10, 0), at(10, 30)];
        assert_eq!(window_mask("10:00-10:15", &times, open()), vec![true, false]);
        assert_eq!(window_mask("10:30-10:45", &times, open()), vec![false, false]);
    }

    #[test]
    fn malformed_window_selects_nothing() {
        let times = [at(10, 5), at(10, 10), at(10, 20)];
        assert_eq!(window_mask("ten-ish", &times, open()), vec![false; 3]);
    }

    #[test]
    fn each_bar_in_at_most_one_window() {
        let set = WindowSet::for_session(&Session::default());
        for h in 10..=15 {
            for m in 0..60 {
                let t = at(h, m);
                let hits = (0..set.len()).filter(|&i| set.mask(i, &[t])[0]).count();
                assert!(hits <= 1, "{t} matched {hits} windows");
            }
        }
    }

    #[test]
    fn explicit_names_skip_malformed() {
        let set = WindowSet::from_names(&["10:00-10:15", "bogus", "11:00-11:15"], &Session::default());
        assert_eq!(set.len(), 2);
        assert_eq!(set.windows()[1].name(), "11:00-11:15");
    }

    #[test]
    fn out_of_range_hour_is_malformed_not_a_window() {
        assert!(matches!(
            Window::parse("99999999:00-10:15"),
            Err(WindowParseError::ClockTime { .. })
        ));
        // 71582789 * 60 wraps to 44 minutes in u32
        assert!(Window::parse("71582789:00-10:15").is_err());
        assert!(Window::parse("25:00-25:15").is_err());
        assert_eq!(
            window_mask("99999999:00-10:15", &[at(10, 5)], open()),
            vec![false]
        );
    }

    #[test]
    fn explicit_names_skip_out_of_range_hours() {
        let set = WindowSet::from_names(
            &["99999999:00-10:15", "10:00-10:15", "10:00-4294967295:00"],
            &Session::default(),
        );
        assert_eq!(set.len(), 1);
        assert_eq!(set.windows()[0].name(), "10:00-10:15");
    }
}
