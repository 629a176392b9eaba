use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::record::MarketPriceRecord;

/// A daily OHLC candle synthesized from two consecutive market prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketCandle {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl MarketCandle {
    /// Candle for `current`, opening at the previous record's price.
    pub fn from_pair(previous: &MarketPriceRecord, current: &MarketPriceRecord) -> Self {
        let open = previous.market_price;
        let close = current.market_price;
        Self {
            date: current.date,
            open,
            high: open.max(close),
            low: open.min(close),
            close,
        }
    }
}

/// Derive candles from a date-sorted price series.
/// The first record has no predecessor and produces no candle.
pub fn derive_candles(prices: &[MarketPriceRecord]) -> Vec<MarketCandle> {
    prices
        .windows(2)
        .map(|pair| MarketCandle::from_pair(&pair[0], &pair[1]))
        .collect()
}
