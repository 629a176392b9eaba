use async_trait::async_trait;
use chrono::NaiveDate;
use maven_market_core::record::MarketPriceRecord;

use crate::error::ProviderError;

/// Source of the daily market price series.
#[async_trait]
pub trait MarketPriceProvider: Send + Sync {
    /// Provider name (for logging/display).
    fn name(&self) -> &str;

    /// Fetch one closing price per trading day in `[start, end]`.
    /// Returns records sorted by date, at most one per date.
    async fn fetch_daily_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MarketPriceRecord>, ProviderError>;
}
