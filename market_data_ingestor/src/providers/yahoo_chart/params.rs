use crate::{
    models::{
        request_params::BarsRequestParams,
        timeframe::{TimeFrame, TimeFrameUnit},
    },
    providers::{ProviderError, ValidationSnafu},
};

/// Map a [`TimeFrame`] onto one of the interval codes the chart API accepts.
pub fn interval_code(tf: &TimeFrame) -> Result<&'static str, ProviderError> {
    let code = match (tf.unit, tf.amount) {
        (TimeFrameUnit::Minute, 1) => "1m",
        (TimeFrameUnit::Minute, 2) => "2m",
        (TimeFrameUnit::Minute, 5) => "5m",
        (TimeFrameUnit::Minute, 15) => "15m",
        (TimeFrameUnit::Minute, 30) => "30m",
        (TimeFrameUnit::Hour, 1) => "1h",
        (TimeFrameUnit::Day, 1) => "1d",
        _ => {
            return ValidationSnafu {
                message: format!("Yahoo chart API has no {tf} interval"),
            }
            .fail();
        }
    };
    Ok(code)
}

/// Build the query string for one chart request.
pub fn construct_params(
    params: &BarsRequestParams,
) -> Result<Vec<(&'static str, String)>, ProviderError> {
    if params.start >= params.end {
        return ValidationSnafu {
            message: format!("empty range {} .. {}", params.start, params.end),
        }
        .fail();
    }
    Ok(vec![
        ("interval", interval_code(&params.timeframe)?.to_string()),
        ("period1", params.start.timestamp().to_string()),
        ("period2", params.end.timestamp().to_string()),
        ("includePrePost", "false".to_string()),
        ("events", "div,splits".to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn interval_codes() {
        assert_eq!(interval_code(&TimeFrame::minutes(5)).unwrap(), "5m");
        assert_eq!(interval_code(&TimeFrame::hour()).unwrap(), "1h");
        assert_eq!(interval_code(&TimeFrame::day()).unwrap(), "1d");
        assert!(interval_code(&TimeFrame::minutes(7)).is_err());
    }

    #[test]
    fn query_carries_epoch_bounds() {
        let end = Utc.with_ymd_and_hms(2025, 3, 3, 2, 5, 0).unwrap();
        let p = BarsRequestParams::lookback("BHP.AX", TimeFrame::minutes(15), 1, end);
        let q = construct_params(&p).unwrap();
        assert!(q.contains(&("interval", "15m".to_string())));
        assert!(q.contains(&("period2", "1740967500".to_string())));
        assert!(q.contains(&("period1", (1740967500 - 86_400).to_string())));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let end = Utc.with_ymd_and_hms(2025, 3, 3, 2, 5, 0).unwrap();
        let mut p = BarsRequestParams::lookback("BHP.AX", TimeFrame::minutes(15), 1, end);
        p.start = p.end;
        assert!(matches!(
            construct_params(&p),
            Err(ProviderError::Validation { .. })
        ));
    }
}
