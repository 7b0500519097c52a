use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use market_watch_core::bar::{Interval, Lookback, PriceBar};
use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ProviderError;
use crate::provider::QuoteProvider;

const CHART_ENDPOINT: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const QUOTE_ENDPOINT: &str = "https://query1.finance.yahoo.com/v7/finance/quote";

/// Yahoo Finance chart and quote endpoints. No API key.
///
/// Bars come from `/v8/finance/chart/{symbol}?range=..&interval=..`, market
/// capitalization from `/v7/finance/quote?symbols=..`.
pub struct YahooProvider {
    client: Client,
    chart_endpoint: String,
    quote_endpoint: String,
}

impl YahooProvider {
    /// `timeout` bounds every HTTP request made by this provider.
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_endpoints(CHART_ENDPOINT, QUOTE_ENDPOINT, timeout)
    }

    /// Point the provider at other hosts, e.g. a local mock server.
    pub fn with_endpoints(
        chart_endpoint: impl Into<String>,
        quote_endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            chart_endpoint: chart_endpoint.into(),
            quote_endpoint: quote_endpoint.into(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let response = self.client.get(url).query(query).send().await?;
        let response = ensure_success(response).await?;
        response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("unexpected payload from {url}: {e}")))
    }
}

async fn ensure_success(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited {
            retry_after_secs: 60,
        }),
        _ if !status.is_success() => Err(ProviderError::Api {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        }),
        _ => Ok(response),
    }
}

#[derive(Debug, Deserialize)]
struct ChartPayload {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartSeries>>,
    error: Option<RemoteError>,
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartSeries {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<OhlcvColumns>,
}

/// Column-oriented OHLCV arrays. Yahoo writes `null` for minutes without trades.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OhlcvColumns {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<i64>>,
}

impl OhlcvColumns {
    fn price(column: &[Option<f64>], row: usize) -> Option<f64> {
        column.get(row).copied().flatten()
    }

    /// Row `row` as `[open, high, low, close]`, or `None` if any of them is missing.
    fn prices_at(&self, row: usize) -> Option<[f64; 4]> {
        Some([
            Self::price(&self.open, row)?,
            Self::price(&self.high, row)?,
            Self::price(&self.low, row)?,
            Self::price(&self.close, row)?,
        ])
    }

    fn volume_at(&self, row: usize) -> i64 {
        self.volume.get(row).copied().flatten().unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuotePayload {
    quote_response: QuoteBody,
}

#[derive(Debug, Deserialize)]
struct QuoteBody {
    result: Option<Vec<QuoteFields>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteFields {
    symbol: String,
    market_cap: Option<f64>,
}

fn to_decimal(value: f64) -> Result<Decimal, ProviderError> {
    Decimal::try_from(value).map_err(|e| ProviderError::Parse(format!("{value} is not a price: {e}")))
}

fn to_utc(secs: i64) -> Result<DateTime<Utc>, ProviderError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| ProviderError::Parse(format!("timestamp out of range: {secs}")))
}

impl ChartSeries {
    /// Rows missing any price are dropped. A missing volume reads as 0.
    /// No timestamps (a window without trades) yields no bars.
    fn into_bars(self) -> Result<Vec<PriceBar>, ProviderError> {
        let Some(columns) = self.indicators.quote.into_iter().next() else {
            return Ok(Vec::new());
        };

        let mut bars = Vec::with_capacity(self.timestamp.len());
        for (row, &secs) in self.timestamp.iter().enumerate() {
            let Some([open, high, low, close]) = columns.prices_at(row) else {
                continue;
            };
            bars.push(PriceBar {
                timestamp: to_utc(secs)?,
                open: to_decimal(open)?,
                high: to_decimal(high)?,
                low: to_decimal(low)?,
                close: to_decimal(close)?,
                volume: columns.volume_at(row),
            });
        }
        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

fn bars_from_payload(payload: ChartPayload) -> Result<Vec<PriceBar>, ProviderError> {
    if let Some(err) = payload.chart.error {
        return Err(ProviderError::Api {
            status: 0,
            message: format!("{}: {}", err.code, err.description),
        });
    }

    let series = payload
        .chart
        .result
        .ok_or_else(|| ProviderError::Parse("chart payload has neither result nor error".into()))?;

    match series.into_iter().next() {
        Some(first) => first.into_bars(),
        None => Ok(Vec::new()),
    }
}

fn market_cap_from_payload(
    payload: QuotePayload,
    symbol: &str,
) -> Result<Option<Decimal>, ProviderError> {
    payload
        .quote_response
        .result
        .unwrap_or_default()
        .into_iter()
        .find(|q| q.symbol.eq_ignore_ascii_case(symbol))
        .and_then(|q| q.market_cap)
        .map(to_decimal)
        .transpose()
}

#[async_trait]
impl QuoteProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch_bars(
        &self,
        symbol: &str,
        lookback: Lookback,
        interval: Interval,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        debug!("yahoo chart {symbol}: range={lookback} interval={interval}");
        let url = format!("{}/{symbol}", self.chart_endpoint);
        let range = lookback.as_range();
        let payload: ChartPayload = self
            .get_json(&url, &[("range", range.as_str()), ("interval", interval.as_str())])
            .await?;
        bars_from_payload(payload)
    }

    async fn fetch_market_cap(&self, symbol: &str) -> Result<Option<Decimal>, ProviderError> {
        debug!("yahoo quote {symbol}");
        let payload: QuotePayload = self
            .get_json(&self.quote_endpoint, &[("symbols", symbol)])
            .await?;
        market_cap_from_payload(payload, symbol)
    }
}
