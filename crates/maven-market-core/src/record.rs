use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single internal purchase of coffee bags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub date: NaiveDate,
    pub product: String,
    pub bag_price: Decimal,
    pub bags: i64,
}

/// One trading day of the external market series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPriceRecord {
    pub date: NaiveDate,
    pub market_price: Decimal,
}
