use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use maven_market_core::dashboard::DashboardQuery;
use maven_market_core::panel::{DashboardResponse, reset_date_range};
use maven_market_core::snapshot::{DashboardSnapshot, DateBounds};
use maven_market_core::timestamp::parse_naive_date;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::page::INDEX_HTML;

pub struct AppState {
    pub snapshot: DashboardSnapshot,
}

/// Request-level failures returned to the page as `{ "error": ... }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad_request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/api/catalog", get(catalog))
        .route("/api/dashboard", get(dashboard))
        .route("/api/reset", get(reset))
        .route("/health", get(health))
        .with_state(state)
}

async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub products: Vec<String>,
    pub default_product: Option<String>,
    pub date_bounds: DateBounds,
}

/// GET /api/catalog — products for the selector and the allowed date range.
async fn catalog(State(state): State<Arc<AppState>>) -> Json<CatalogResponse> {
    let snapshot = &state.snapshot;
    Json(CatalogResponse {
        products: snapshot.product_catalog().to_vec(),
        default_product: snapshot.default_product().map(str::to_string),
        date_bounds: snapshot.date_bounds(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    product: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

fn optional_date(raw: Option<&str>, name: &str) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_naive_date(s)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("invalid {name} date: {s}"))),
    }
}

impl DashboardParams {
    fn into_query(self) -> Result<DashboardQuery, ApiError> {
        Ok(DashboardQuery {
            start: optional_date(self.start.as_deref(), "start")?,
            end: optional_date(self.end.as_deref(), "end")?,
            product: self.product.filter(|p| !p.is_empty()),
        })
    }
}

/// GET /api/dashboard?product=&start=&end= — chart and KPIs for the inputs.
async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let query = params.into_query()?;
    let (resolved, result) = query.run(&state.snapshot);
    debug!(
        "dashboard {} {} to {}: {}",
        resolved.product,
        resolved.start,
        resolved.end,
        if result.is_empty() { "no data" } else { "populated" }
    );
    Ok(Json(DashboardResponse::new(&resolved, &result)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetParams {
    n_clicks: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ResetResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// GET /api/reset?n_clicks= — default date range, or `{}` for no update.
async fn reset(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResetParams>,
) -> Json<ResetResponse> {
    let reset = reset_date_range(params.n_clicks.unwrap_or(0), state.snapshot.date_bounds());
    Json(match reset {
        Some(range) => ResetResponse {
            start: Some(range.start),
            end: Some(range.end),
        },
        None => ResetResponse::default(),
    })
}
