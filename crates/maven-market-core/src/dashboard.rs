//! Filtering of both series for one product and date range, and the three
//! percentage KPIs derived from the filtered rows.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::candle::MarketCandle;
use crate::record::{MarketPriceRecord, OrderRecord};
use crate::snapshot::DashboardSnapshot;

pub const NO_DATA_MESSAGE: &str = "No data for this product in the selected date range.";

/// Placeholder for a KPI that cannot be computed.
pub const NOT_AVAILABLE: &str = "N/A";

/// Percentage growth from `start` to `end`.
///
/// Absent when either value is absent, when `start` is zero, or when the
/// decimal arithmetic overflows.
pub fn pct_growth(start: Option<Decimal>, end: Option<Decimal>) -> Option<Decimal> {
    let (start, end) = (start?, end?);
    if start.is_zero() {
        return None;
    }
    end.checked_sub(start)?
        .checked_div(start)?
        .checked_mul(Decimal::ONE_HUNDRED)
}

/// Two decimals with a trailing `%`, or `N/A`.
pub fn format_pct(value: Option<Decimal>) -> String {
    match value {
        Some(v) => {
            // Keep the sign of negatives that round to zero ("-0.00%").
            let sign = if v.is_sign_negative() && !v.is_zero() { "-" } else { "" };
            let rounded = v
                .abs()
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            format!("{sign}{rounded:.2}%")
        }
        None => NOT_AVAILABLE.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kpis {
    /// Growth of the market price across the range.
    pub market_growth: Option<Decimal>,
    /// Growth of the bag price across the range.
    pub price_change: Option<Decimal>,
    /// Last bag price relative to the last market price.
    pub latest_diff: Option<Decimal>,
}

impl Kpis {
    pub fn derive(orders: &[OrderRecord], market: &[MarketPriceRecord]) -> Self {
        let earliest_order = orders.first().map(|o| o.bag_price);
        let latest_order = orders.last().map(|o| o.bag_price);
        let earliest_market = market.first().map(|p| p.market_price);
        let latest_market = market.last().map(|p| p.market_price);

        Self {
            market_growth: pct_growth(earliest_market, latest_market),
            price_change: pct_growth(earliest_order, latest_order),
            latest_diff: latest_market.and_then(|m| pct_growth(Some(m), latest_order)),
        }
    }
}

/// Rows and KPIs for a range that matched at least one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardView {
    pub orders: Vec<OrderRecord>,
    pub candles: Vec<MarketCandle>,
    pub market: Vec<MarketPriceRecord>,
    pub kpis: Kpis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DashboardResult {
    Empty { message: String },
    Populated(DashboardView),
}

impl DashboardResult {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty { .. })
    }

    pub fn view(&self) -> Option<&DashboardView> {
        match self {
            Self::Populated(view) => Some(view),
            Self::Empty { .. } => None,
        }
    }
}

fn in_range(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    start <= date && date <= end
}

/// Filter both series for `product` within `[start, end]` and derive KPIs.
///
/// A reversed range matches nothing and yields [`DashboardResult::Empty`].
pub fn compute(
    snapshot: &DashboardSnapshot,
    product: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> DashboardResult {
    let orders: Vec<OrderRecord> = snapshot
        .orders()
        .iter()
        .filter(|o| o.product == product && in_range(o.date, start, end))
        .cloned()
        .collect();

    if orders.is_empty() {
        return DashboardResult::Empty {
            message: NO_DATA_MESSAGE.to_string(),
        };
    }

    let candles: Vec<MarketCandle> = snapshot
        .market_candles()
        .iter()
        .filter(|c| in_range(c.date, start, end))
        .cloned()
        .collect();

    let mut market: Vec<MarketPriceRecord> = snapshot
        .market_prices()
        .iter()
        .filter(|p| in_range(p.date, start, end))
        .cloned()
        .collect();
    market.sort_by_key(|p| p.date);

    let kpis = Kpis::derive(&orders, &market);

    DashboardResult::Populated(DashboardView {
        orders,
        candles,
        market,
        kpis,
    })
}

/// Inputs from the page; missing values fall back to the initial selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardQuery {
    pub product: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// A query with every input filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub product: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DashboardQuery {
    pub fn resolve(&self, snapshot: &DashboardSnapshot) -> ResolvedQuery {
        let bounds = snapshot.date_bounds();
        let product = self
            .product
            .clone()
            .or_else(|| snapshot.default_product().map(str::to_string))
            .unwrap_or_default();

        ResolvedQuery {
            product,
            start: self.start.unwrap_or(bounds.min),
            end: self.end.unwrap_or(bounds.max),
        }
    }

    pub fn run(&self, snapshot: &DashboardSnapshot) -> (ResolvedQuery, DashboardResult) {
        let resolved = self.resolve(snapshot);
        let result = compute(snapshot, &resolved.product, resolved.start, resolved.end);
        (resolved, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn order(d: NaiveDate, product: &str, price: Decimal, bags: i64) -> OrderRecord {
        OrderRecord {
            date: d,
            product: product.to_string(),
            bag_price: price,
            bags,
        }
    }

    fn price(d: NaiveDate, p: Decimal) -> MarketPriceRecord {
        MarketPriceRecord {
            date: d,
            market_price: p,
        }
    }

    fn arabica_snapshot() -> DashboardSnapshot {
        DashboardSnapshot::from_records(
            vec![
                order(date(2023, 1, 1), "Arabica", dec!(10.00), 5),
                order(date(2023, 2, 1), "Arabica", dec!(12.00), 6),
            ],
            vec![price(date(2023, 1, 1), dec!(4.0)), price(date(2023, 2, 1), dec!(5.0))],
        )
        .unwrap()
    }

    fn mixed_snapshot() -> DashboardSnapshot {
        let orders = (1..=28)
            .map(|d| {
                let product = if d % 3 == 0 { "Robusta" } else { "Arabica" };
                order(date(2023, 2, d), product, Decimal::from(d) + dec!(0.5), d as i64)
            })
            .collect();
        let prices = (1..=28)
            .filter(|d| d % 7 != 0)
            .map(|d| price(date(2023, 2, d), Decimal::from(100 + d)))
            .collect();
        DashboardSnapshot::from_records(orders, prices).unwrap()
    }

    #[test]
    fn arabica_scenario() {
        let snapshot = arabica_snapshot();
        let result = compute(&snapshot, "Arabica", date(2023, 1, 1), date(2023, 2, 1));
        let view = result.view().expect("populated");

        assert_eq!(view.orders.len(), 2);
        assert_eq!(
            view.candles,
            vec![MarketCandle {
                date: date(2023, 2, 1),
                open: dec!(4.0),
                high: dec!(5.0),
                low: dec!(4.0),
                close: dec!(5.0),
            }]
        );
        assert_eq!(view.kpis.price_change, Some(dec!(20)));
        assert_eq!(view.kpis.market_growth, Some(dec!(25)));
        assert_eq!(view.kpis.latest_diff, Some(dec!(140)));

        assert_eq!(format_pct(view.kpis.price_change), "20.00%");
        assert_eq!(format_pct(view.kpis.market_growth), "25.00%");
        assert_eq!(format_pct(view.kpis.latest_diff), "140.00%");
    }

    #[test]
    fn unmatched_product_is_empty() {
        let snapshot = arabica_snapshot();
        let result = compute(&snapshot, "Robusta", date(2023, 1, 1), date(2023, 2, 1));
        assert_eq!(
            result,
            DashboardResult::Empty {
                message: NO_DATA_MESSAGE.to_string()
            }
        );
        assert!(result.view().is_none());
    }

    #[test]
    fn range_without_orders_is_empty() {
        let snapshot = arabica_snapshot();
        let result = compute(&snapshot, "Arabica", date(2023, 1, 2), date(2023, 1, 31));
        assert!(result.is_empty());
    }

    #[test]
    fn reversed_range_is_empty() {
        let snapshot = arabica_snapshot();
        let result = compute(&snapshot, "Arabica", date(2023, 2, 1), date(2023, 1, 1));
        assert!(result.is_empty());
    }

    #[test]
    fn missing_market_rows_give_na() {
        let snapshot = DashboardSnapshot::from_records(
            vec![
                order(date(2023, 1, 1), "Arabica", dec!(10.00), 5),
                order(date(2023, 2, 1), "Arabica", dec!(12.00), 6),
            ],
            vec![price(date(2022, 6, 1), dec!(4.0)), price(date(2022, 7, 1), dec!(5.0))],
        )
        .unwrap();

        let result = compute(&snapshot, "Arabica", date(2023, 1, 1), date(2023, 2, 1));
        let view = result.view().unwrap();
        assert!(view.market.is_empty());
        assert!(view.candles.is_empty());
        assert_eq!(view.kpis.market_growth, None);
        assert_eq!(view.kpis.latest_diff, None);
        assert_eq!(format_pct(view.kpis.market_growth), "N/A");
        assert_eq!(format_pct(view.kpis.price_change), "20.00%");
    }

    #[test]
    fn bounds_are_inclusive() {
        let snapshot = arabica_snapshot();
        let result = compute(&snapshot, "Arabica", date(2023, 2, 1), date(2023, 2, 1));
        let view = result.view().unwrap();
        assert_eq!(view.orders.len(), 1);
        assert_eq!(view.market.len(), 1);
        assert_eq!(view.candles.len(), 1);
        // single row on both sides: no growth, but a price-level difference
        assert_eq!(view.kpis.price_change, Some(Decimal::ZERO));
        assert_eq!(view.kpis.market_growth, Some(Decimal::ZERO));
        assert_eq!(view.kpis.latest_diff, Some(dec!(140)));
    }

    #[test]
    fn filtered_orders_match_product_and_range() {
        let snapshot = mixed_snapshot();
        for product in ["Arabica", "Robusta"] {
            for start in 1..=28 {
                for end in start..=28 {
                    let (start, end) = (date(2023, 2, start), date(2023, 2, end));
                    let Some(view) = compute(&snapshot, product, start, end).view().cloned() else {
                        continue;
                    };
                    assert!(view.orders.windows(2).all(|w| w[0].date <= w[1].date));
                    assert!(view.orders.iter().all(|o| o.product == product));
                    assert!(view.orders.iter().all(|o| start <= o.date && o.date <= end));
                    assert!(view.candles.iter().all(|c| start <= c.date && c.date <= end));
                    assert!(view.market.windows(2).all(|w| w[0].date <= w[1].date));
                }
            }
        }
    }

    #[test]
    fn compute_is_idempotent() {
        let snapshot = mixed_snapshot();
        let first = compute(&snapshot, "Robusta", date(2023, 2, 2), date(2023, 2, 20));
        let second = compute(&snapshot, "Robusta", date(2023, 2, 2), date(2023, 2, 20));
        assert_eq!(first, second);
    }

    #[test]
    fn pct_growth_absent_cases() {
        assert_eq!(pct_growth(None, Some(dec!(5))), None);
        assert_eq!(pct_growth(Some(dec!(0)), Some(dec!(5))), None);
        assert_eq!(pct_growth(Some(dec!(0.00)), Some(dec!(5))), None);
        assert_eq!(pct_growth(Some(dec!(5)), None), None);
    }

    #[test]
    fn pct_growth_values() {
        assert_eq!(pct_growth(Some(dec!(10)), Some(dec!(12))), Some(dec!(20)));
        assert_eq!(pct_growth(Some(dec!(4)), Some(dec!(3))), Some(dec!(-25)));
        assert_eq!(pct_growth(Some(dec!(-2)), Some(dec!(1))), Some(dec!(-150)));
        let third = pct_growth(Some(dec!(3)), Some(dec!(4))).unwrap();
        assert!((third - dec!(33.3333333333)).abs() < dec!(0.0000001));
    }

    #[test]
    fn pct_growth_overflow_is_absent() {
        let tiny = dec!(0.0000000000000000000000000001);
        assert_eq!(pct_growth(Some(tiny), Some(Decimal::MAX)), None);
    }

    #[test]
    fn format_pct_rounds_to_two_places() {
        assert_eq!(format_pct(Some(dec!(33.333333))), "33.33%");
        assert_eq!(format_pct(Some(dec!(2.005))), "2.01%");
        assert_eq!(format_pct(Some(dec!(-7.5))), "-7.50%");
        assert_eq!(format_pct(Some(dec!(-3.125))), "-3.13%");
        assert_eq!(format_pct(Some(dec!(-0.001))), "-0.00%");
        assert_eq!(format_pct(Some(dec!(0.001))), "0.00%");
        assert_eq!(format_pct(Some(dec!(0))), "0.00%");
        assert_eq!(format_pct(None), "N/A");
    }

    #[test]
    fn empty_query_uses_defaults() {
        let snapshot = mixed_snapshot();
        let (resolved, result) = DashboardQuery::default().run(&snapshot);
        assert_eq!(resolved.product, "Arabica");
        assert_eq!(resolved.start, date(2023, 2, 1));
        assert_eq!(resolved.end, date(2023, 2, 28));
        assert!(!result.is_empty());
    }

    #[test]
    fn query_overrides_defaults() {
        let snapshot = mixed_snapshot();
        let query = DashboardQuery {
            product: Some("Robusta".into()),
            start: Some(date(2023, 2, 3)),
            end: None,
        };
        let resolved = query.resolve(&snapshot);
        assert_eq!(resolved.product, "Robusta");
        assert_eq!(resolved.start, date(2023, 2, 3));
        assert_eq!(resolved.end, date(2023, 2, 28));
    }
}
