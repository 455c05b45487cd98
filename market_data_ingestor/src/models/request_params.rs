use chrono::{DateTime, Duration, Utc};

use crate::models::timeframe::TimeFrame;

/// What to fetch: symbols, bar width and a UTC range. Each
/// [`DataProvider`](crate::providers::DataProvider) maps it onto its own API.
#[derive(Clone, Debug)]
pub struct BarsRequestParams {
    /// Symbols to request (e.g., `["BHP.AX"]`).
    pub symbols: Vec<String>,

    /// Providers reject widths their source cannot serve.
    pub timeframe: TimeFrame,

    /// Start of the requested time range (inclusive, UTC).
    pub start: DateTime<Utc>,

    /// End of the requested time range (exclusive, UTC).
    pub end: DateTime<Utc>,
}

impl BarsRequestParams {
    /// Request covering the `lookback_days` calendar days before `now`.
    pub fn lookback(
        symbol: impl Into<String>,
        timeframe: TimeFrame,
        lookback_days: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            symbols: vec![symbol.into()],
            timeframe,
            start: now - Duration::days(i64::from(lookback_days)),
            end: now,
        }
    }
}
