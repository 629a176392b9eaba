use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::candle::{MarketCandle, derive_candles};
use crate::error::DataLoadError;
use crate::record::{MarketPriceRecord, OrderRecord};
use crate::source;

/// Earliest and latest order dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBounds {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

/// Read-only view of both series, built once at startup.
///
/// Orders and prices are sorted ascending by date (stable, so same-day rows
/// keep their file order). Nothing is mutated after construction; share it
/// behind an `Arc`.
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    orders: Vec<OrderRecord>,
    market_prices: Vec<MarketPriceRecord>,
    market_candles: Vec<MarketCandle>,
    product_catalog: Vec<String>,
    date_bounds: DateBounds,
}

impl DashboardSnapshot {
    /// Load both sources from disk (`.csv` or `.parquet`).
    pub fn load(orders_path: &Path, market_path: &Path) -> Result<Self, DataLoadError> {
        let orders = source::load_orders(orders_path)?;
        let market_prices = source::load_market_prices(market_path)?;
        let snapshot = Self::from_records(orders, market_prices)?;

        info!(
            "Loaded {} order(s), {} market price(s), {} candle(s), {} product(s), {} to {}",
            snapshot.orders.len(),
            snapshot.market_prices.len(),
            snapshot.market_candles.len(),
            snapshot.product_catalog.len(),
            snapshot.date_bounds.min,
            snapshot.date_bounds.max,
        );
        Ok(snapshot)
    }

    pub fn from_records(
        mut orders: Vec<OrderRecord>,
        mut market_prices: Vec<MarketPriceRecord>,
    ) -> Result<Self, DataLoadError> {
        if market_prices.is_empty() {
            return Err(DataLoadError::Empty {
                source_name: "market prices".into(),
            });
        }

        orders.sort_by_key(|o| o.date);
        market_prices.sort_by_key(|p| p.date);

        let date_bounds = match (orders.first(), orders.last()) {
            (Some(first), Some(last)) => DateBounds {
                min: first.date,
                max: last.date,
            },
            _ => {
                return Err(DataLoadError::Empty {
                    source_name: "orders".into(),
                });
            }
        };

        let mut product_catalog: Vec<String> = orders
            .iter()
            .filter(|o| !o.product.is_empty())
            .map(|o| o.product.clone())
            .collect();
        product_catalog.sort();
        product_catalog.dedup();

        let market_candles = derive_candles(&market_prices);

        Ok(Self {
            orders,
            market_prices,
            market_candles,
            product_catalog,
            date_bounds,
        })
    }

    pub fn orders(&self) -> &[OrderRecord] {
        &self.orders
    }

    pub fn market_prices(&self) -> &[MarketPriceRecord] {
        &self.market_prices
    }

    pub fn market_candles(&self) -> &[MarketCandle] {
        &self.market_candles
    }

    pub fn product_catalog(&self) -> &[String] {
        &self.product_catalog
    }

    pub fn date_bounds(&self) -> DateBounds {
        self.date_bounds
    }

    /// First product of the catalog, preselected on the page.
    pub fn default_product(&self) -> Option<&str> {
        self.product_catalog.first().map(String::as_str)
    }
}
