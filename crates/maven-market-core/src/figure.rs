//! Plotly-compatible chart description for a dashboard view.
//!
//! The figure serializes straight into the `{ data, layout }` object that
//! `Plotly.react` accepts.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::dashboard::DashboardView;

pub const MARKET_TRACE_NAME: &str = "Market Price (KC=F)";
pub const BAG_PRICE_TRACE_NAME: &str = "Maven Bag Price";
pub const BAGS_TRACE_NAME: &str = "Bags Ordered";

const DARK_BACKGROUND: &str = "rgb(17,17,17)";
const DARK_FOREGROUND: &str = "#f2f5fa";
const DARK_GRID: &str = "#283442";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Candlestick(CandlestickTrace),
    Scatter(ScatterTrace),
    Bar(BarTrace),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandlestickTrace {
    pub name: String,
    pub x: Vec<String>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub increasing: Direction,
    pub decreasing: Direction,
    pub showlegend: bool,
}

/// Styling for rising or falling candles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub line: Line,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterTrace {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<f64>,
    pub mode: String,
    pub line: Line,
    pub marker: Marker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarTrace {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<i64>,
    pub yaxis: String,
    pub marker: Marker,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlaying: Option<String>,
    pub gridcolor: String,
}

impl Axis {
    fn titled(text: &str) -> Self {
        Self {
            title: Some(Title { text: text.into() }),
            side: None,
            overlaying: None,
            gridcolor: DARK_GRID.into(),
        }
    }

    fn on_side(mut self, side: &str) -> Self {
        self.side = Some(side.into());
        self
    }

    fn overlaying(mut self, axis: &str) -> Self {
        self.overlaying = Some(axis.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub x: f64,
    pub y: f64,
    pub xanchor: String,
    pub yanchor: String,
    pub bgcolor: String,
    pub font: Font,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis2: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovermode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
    pub paper_bgcolor: String,
    pub plot_bgcolor: String,
    pub font: Font,
}

impl Layout {
    /// Dark theme with nothing else set.
    pub fn dark() -> Self {
        Self {
            title: None,
            xaxis: None,
            yaxis: None,
            yaxis2: None,
            hovermode: None,
            legend: None,
            paper_bgcolor: DARK_BACKGROUND.into(),
            plot_bgcolor: DARK_BACKGROUND.into(),
            font: Font {
                color: DARK_FOREGROUND.into(),
            },
        }
    }
}

fn x_values(dates: impl Iterator<Item = NaiveDate>) -> Vec<String> {
    dates.map(|d| d.format("%Y-%m-%d").to_string()).collect()
}

fn y_values<'a>(prices: impl Iterator<Item = &'a Decimal>) -> Vec<f64> {
    prices.map(|p| p.to_f64().unwrap_or(f64::NAN)).collect()
}

impl Figure {
    /// Figure with no traces, shown when nothing matched.
    pub fn blank() -> Self {
        Self {
            data: Vec::new(),
            layout: Layout::dark(),
        }
    }

    /// Market candles, bag price line and bag count bars for one product.
    pub fn from_view(product: &str, view: &DashboardView) -> Self {
        let candles = &view.candles;
        let candlestick = CandlestickTrace {
            name: MARKET_TRACE_NAME.into(),
            x: x_values(candles.iter().map(|c| c.date)),
            open: y_values(candles.iter().map(|c| &c.open)),
            high: y_values(candles.iter().map(|c| &c.high)),
            low: y_values(candles.iter().map(|c| &c.low)),
            close: y_values(candles.iter().map(|c| &c.close)),
            increasing: Direction {
                line: Line {
                    color: "green".into(),
                    width: None,
                },
            },
            decreasing: Direction {
                line: Line {
                    color: "red".into(),
                    width: None,
                },
            },
            showlegend: true,
        };

        let order_dates = x_values(view.orders.iter().map(|o| o.date));

        let bag_price = ScatterTrace {
            name: BAG_PRICE_TRACE_NAME.into(),
            x: order_dates.clone(),
            y: y_values(view.orders.iter().map(|o| &o.bag_price)),
            mode: "lines+markers".into(),
            line: Line {
                color: "blue".into(),
                width: Some(2.0),
            },
            marker: Marker {
                color: "blue".into(),
                size: Some(5.0),
            },
        };

        let bags = BarTrace {
            name: BAGS_TRACE_NAME.into(),
            x: order_dates,
            y: view.orders.iter().map(|o| o.bags).collect(),
            yaxis: "y2".into(),
            marker: Marker {
                color: "orange".into(),
                size: None,
            },
            opacity: 0.5,
        };

        let layout = Layout {
            title: Some(Title {
                text: format!("{product} vs. Coffee Market (Candlestick)"),
            }),
            xaxis: Some(Axis::titled("Date")),
            yaxis: Some(Axis::titled("Price (USD)").on_side("left")),
            yaxis2: Some(Axis::titled("Bags Ordered").on_side("right").overlaying("y")),
            hovermode: Some("x unified".into()),
            legend: Some(Legend {
                x: 0.01,
                y: 0.01,
                xanchor: "left".into(),
                yanchor: "bottom".into(),
                bgcolor: "rgba(0,0,0,0.6)".into(),
                font: Font {
                    color: "white".into(),
                },
            }),
            ..Layout::dark()
        };

        Self {
            data: vec![
                Trace::Candlestick(candlestick),
                Trace::Scatter(bag_price),
                Trace::Bar(bags),
            ],
            layout,
        }
    }
}
