use std::num::NonZeroU32;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, header};
use shared_utils::env::get_env_var_or;
use snafu::ResultExt;
use tracing::debug;

use crate::{
    models::{bar_series::BarSeries, request_params::BarsRequestParams},
    providers::{
        ApiSnafu, ClientBuildSnafu, DataProvider, InvalidHeaderSnafu, ProviderError,
        ProviderInitError, ReqwestSnafu,
        yahoo_chart::{params::construct_params, response::ChartEnvelope},
    },
};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) tod-analyzer";

pub struct YahooChartProvider {
    client: Client,
    base_url: String,
    limiter: DefaultDirectRateLimiter,
}

impl YahooChartProvider {
    /// Creates a provider that issues at most `requests_per_second` requests.
    ///
    /// The base URL can be overridden with `YAHOO_CHART_BASE_URL` (useful for
    /// pointing at a recording proxy).
    pub fn new(requests_per_second: u32) -> Result<Self, ProviderInitError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(USER_AGENT).context(InvalidHeaderSnafu)?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context(ClientBuildSnafu)?;

        let rps = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(4u32));

        Ok(Self {
            client,
            base_url: get_env_var_or("YAHOO_CHART_BASE_URL", DEFAULT_BASE_URL),
            limiter: RateLimiter::direct(Quota::per_second(rps)),
        })
    }

    async fn fetch_symbol(
        &self,
        symbol: &str,
        params: &BarsRequestParams,
    ) -> Result<Option<BarSeries>, ProviderError> {
        let query = construct_params(params)?;
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), symbol);

        self.limiter.until_ready().await;
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        let envelope = if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            response.json::<ChartEnvelope>().await.context(ReqwestSnafu)?
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return ApiSnafu {
                message: format!("{status}: {body}"),
            }
            .fail();
        };

        if let Some(err) = envelope.chart.error {
            // Yahoo reports unknown or delisted symbols this way.
            if err.code == "Not Found" {
                debug!(symbol = %symbol, "no chart data: {}", err.description);
                return Ok(None);
            }
            return ApiSnafu {
                message: format!("{}: {}", err.code, err.description),
            }
            .fail();
        }

        Ok(envelope
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .map(|r| r.into_series(params.timeframe)))
    }
}

#[async_trait]
impl DataProvider for YahooChartProvider {
    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<Vec<BarSeries>, ProviderError> {
        let mut out = Vec::with_capacity(params.symbols.len());
        for symbol in &params.symbols {
            if let Some(series) = self.fetch_symbol(symbol, &params).await? {
                debug!(symbol = %symbol, timeframe = %params.timeframe, bars = series.len(), "fetched");
                out.push(series);
            }
        }
        Ok(out)
    }
}
