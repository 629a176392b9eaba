use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dashboard::{DashboardResult, Kpis, ResolvedQuery, format_pct};
use crate::figure::Figure;
use crate::snapshot::DateBounds;

pub const MARKET_GROWTH_LABEL: &str = "Market Growth";
pub const PRICE_CHANGE_LABEL: &str = "Price Change";
pub const LATEST_DIFF_LABEL: &str = "Latest Diff";

/// One labeled KPI value, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiCard {
    pub label: String,
    pub value: String,
}

/// The three cards in display order: Market Growth, Price Change, Latest Diff.
pub fn kpi_cards(kpis: &Kpis) -> Vec<KpiCard> {
    vec![
        KpiCard {
            label: MARKET_GROWTH_LABEL.into(),
            value: format_pct(kpis.market_growth),
        },
        KpiCard {
            label: PRICE_CHANGE_LABEL.into(),
            value: format_pct(kpis.price_change),
        },
        KpiCard {
            label: LATEST_DIFF_LABEL.into(),
            value: format!("{} vs. Market", format_pct(kpis.latest_diff)),
        },
    ]
}

/// Everything the page needs to re-render after an input change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub product: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub figure: Figure,
    pub kpis: Vec<KpiCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl DashboardResponse {
    pub fn new(query: &ResolvedQuery, result: &DashboardResult) -> Self {
        let (figure, kpis, notice) = match result {
            DashboardResult::Empty { message } => {
                (Figure::blank(), Vec::new(), Some(message.clone()))
            }
            DashboardResult::Populated(view) => (
                Figure::from_view(&query.product, view),
                kpi_cards(&view.kpis),
                None,
            ),
        };

        Self {
            product: query.product.clone(),
            start: query.start,
            end: query.end,
            figure,
            kpis,
            notice,
        }
    }
}

/// New start and end values for the date inputs, as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRangeReset {
    pub start: String,
    pub end: String,
}

/// Reset the date inputs to the full order range once the button has been
/// pressed at least once. `None` leaves the inputs unchanged.
pub fn reset_date_range(n_clicks: u64, bounds: DateBounds) -> Option<DateRangeReset> {
    (n_clicks > 0).then(|| DateRangeReset {
        start: bounds.min.format("%Y-%m-%d").to_string(),
        end: bounds.max.format("%Y-%m-%d").to_string(),
    })
}
