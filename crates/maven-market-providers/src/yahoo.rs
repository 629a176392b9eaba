use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use maven_market_core::record::MarketPriceRecord;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::error::ProviderError;
use crate::provider::MarketPriceProvider;

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance coffee "C" futures, continuous contract.
pub const COFFEE_FUTURES_SYMBOL: &str = "KC=F";

/// Yahoo Finance daily chart provider.
/// No authentication required.
pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(YAHOO_CHART_URL.to_string())
    }

    /// Create with a custom base URL (for testing).
    pub fn with_base_url(base_url: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: Client::builder().user_agent("Mozilla/5.0").build()?,
            base_url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct YahooResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    meta: Option<YahooMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooMeta {
    /// Exchange offset from UTC in seconds.
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    close: Vec<Option<f64>>,
}

fn f64_to_decimal(val: f64) -> Result<Decimal, ProviderError> {
    Decimal::try_from(val).map_err(|e| ProviderError::Parse(format!("invalid decimal value: {e}")))
}

/// Exchange-local calendar date of a bar timestamp.
fn exchange_date(ts: i64, gmtoffset: i64) -> Result<NaiveDate, ProviderError> {
    ts.checked_add(gmtoffset)
        .and_then(|local| DateTime::from_timestamp(local, 0))
        .map(|dt| dt.date_naive())
        .ok_or_else(|| ProviderError::Parse(format!("invalid unix timestamp: {ts}")))
}

fn parse_yahoo_result(result: &YahooResult) -> Result<Vec<MarketPriceRecord>, ProviderError> {
    let timestamps = result
        .timestamp
        .as_ref()
        .ok_or_else(|| ProviderError::Parse("missing timestamps".into()))?;

    let Some(quote) = result.indicators.quote.first() else {
        return Ok(Vec::new());
    };
    let gmtoffset = result
        .meta
        .as_ref()
        .and_then(|m| m.gmtoffset)
        .unwrap_or(0);

    let mut prices = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        // skip days with missing data
        let Some(close) = quote.close.get(i).copied().flatten() else {
            continue;
        };
        prices.push(MarketPriceRecord {
            date: exchange_date(ts, gmtoffset)?,
            market_price: f64_to_decimal(close)?,
        });
    }

    Ok(prices)
}

/// Sort by date and keep the last record seen for each date.
fn normalize(mut prices: Vec<MarketPriceRecord>) -> Vec<MarketPriceRecord> {
    prices.sort_by_key(|p| p.date);
    let mut out: Vec<MarketPriceRecord> = Vec::with_capacity(prices.len());
    for price in prices {
        match out.last_mut() {
            Some(last) if last.date == price.date => *last = price,
            _ => out.push(price),
        }
    }
    out
}

#[async_trait]
impl MarketPriceProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch_daily_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MarketPriceRecord>, ProviderError> {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .succ_opt()
            .unwrap_or(end)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp();

        debug!("{symbol}: requesting daily bars {start} to {end}");

        let response = self
            .client
            .get(format!("{}/{}", self.base_url, symbol))
            .query(&[
                ("period1", start_ts.to_string()),
                ("period2", end_ts.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 60,
            });
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status,
                message: body,
            });
        }

        let body: YahooResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("failed to parse response: {e}")))?;

        let prices = prices_from_response(body)?;
        let prices: Vec<_> = prices
            .into_iter()
            .filter(|p| start <= p.date && p.date <= end)
            .collect();

        if prices.is_empty() {
            return Err(ProviderError::NoData {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }
        Ok(prices)
    }
}

fn prices_from_response(body: YahooResponse) -> Result<Vec<MarketPriceRecord>, ProviderError> {
    if let Some(error) = body.chart.error {
        return Err(ProviderError::Api {
            status: 0,
            message: format!("{}: {}", error.code, error.description),
        });
    }

    let results = body
        .chart
        .result
        .ok_or_else(|| ProviderError::Parse("no results in response".into()))?;

    match results.first() {
        Some(result) => Ok(normalize(parse_yahoo_result(result)?)),
        None => Ok(Vec::new()),
    }
}
