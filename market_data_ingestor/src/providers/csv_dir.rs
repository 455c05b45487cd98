//! File-backed provider reading one CSV export per symbol and timeframe.
//!
//! Layout: `<dir>/<SYMBOL>_<timeframe>.csv`, e.g. `BHP.AX_5m.csv`, with a
//! header row `timestamp,open,high,low,close,volume`. Timestamps may be
//! RFC-3339 with an offset, naive (read as UTC) or epoch seconds; see
//! [`crate::time::parse_any_to_utc`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use snafu::ResultExt;
use tracing::{debug, warn};

use crate::{
    models::{bar::Bar, bar_series::BarSeries, request_params::BarsRequestParams, timeframe::TimeFrame},
    providers::{DataProvider, MissingDataDirSnafu, ProviderError, ProviderInitError, ReadSnafu},
    time::parse_any_to_utc,
};

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Datetime", alias = "Date", alias = "time")]
    timestamp: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    /// Empty cells read as no volume.
    #[serde(alias = "Volume", default)]
    volume: Option<f64>,
}

/// A bad row (wrong field count, unparsable number) spoils only itself;
/// I/O failures spoil the file.
fn is_row_error(err: &csv::Error) -> bool {
    matches!(
        err.kind(),
        csv::ErrorKind::Deserialize { .. } | csv::ErrorKind::UnequalLengths { .. } | csv::ErrorKind::Utf8 { .. }
    )
}

pub struct CsvDirProvider {
    dir: PathBuf,
}

impl CsvDirProvider {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, ProviderInitError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return MissingDataDirSnafu {
                path: dir.display().to_string(),
            }
            .fail();
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Path the provider reads for `symbol` at `timeframe`.
    pub fn file_for(&self, symbol: &str, timeframe: &TimeFrame) -> PathBuf {
        self.dir.join(format!("{symbol}_{timeframe}.csv"))
    }

    fn read_file(
        &self,
        symbol: &str,
        params: &BarsRequestParams,
    ) -> Result<Option<BarSeries>, ProviderError> {
        let path = self.file_for(symbol, &params.timeframe);
        if !path.is_file() {
            debug!(path = %path.display(), "no export for symbol");
            return Ok(None);
        }
        let shown = path.display().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .context(ReadSnafu { path: shown.clone() })?;

        let mut bars = Vec::new();
        let mut skipped = 0usize;
        for row in reader.deserialize::<CsvRow>() {
            let row = match row {
                Ok(row) => row,
                Err(err) if is_row_error(&err) => {
                    debug!(path = %shown, error = %err, "undecodable row");
                    skipped += 1;
                    continue;
                }
                Err(err) => return Err(err).context(ReadSnafu { path: shown.clone() }),
            };
            let Ok(timestamp) = parse_any_to_utc(&row.timestamp) else {
                skipped += 1;
                continue;
            };
            if timestamp < params.start || timestamp >= params.end {
                continue;
            }
            let bar = Bar {
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume.unwrap_or(0.0),
            };
            if bar.is_valid() {
                bars.push(bar);
            } else {
                skipped += 1;
            }
        }
        if skipped > 0 {
            warn!(path = %shown, skipped, "skipped unreadable rows");
        }

        let mut series = BarSeries::new(symbol, params.timeframe, bars);
        series.sort();
        Ok(Some(series))
    }
}

#[async_trait]
impl DataProvider for CsvDirProvider {
    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<Vec<BarSeries>, ProviderError> {
        let mut out = Vec::new();
        for symbol in &params.symbols {
            if let Some(series) = self.read_file(symbol, &params)? {
                out.push(series);
            }
        }
        Ok(out)
    }
}
