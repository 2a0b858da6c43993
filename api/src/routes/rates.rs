use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use domain::{normalize_symbol, Conversion, Currency};
use serde::Serialize;

use super::{core_status, PairQuery};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/currencies", get(list_currencies))
        .route("/convert", get(convert))
        .route("/chart", get(chart))
}

async fn list_currencies(State(state): State<AppState>) -> Result<Json<Vec<Currency>>, StatusCode> {
    state
        .currencies
        .list_currencies()
        .await
        .map(Json)
        .map_err(core_status)
}

async fn convert(
    State(state): State<AppState>,
    Query(pair): Query<PairQuery>,
) -> Result<Json<Conversion>, StatusCode> {
    let from = normalize_symbol(&pair.from);
    let to = normalize_symbol(&pair.to);
    let rate = state
        .rates
        .current_rate(&from, &to)
        .await
        .map_err(core_status)?;
    Ok(Json(Conversion { from, to, rate }))
}

#[derive(Serialize)]
struct Chart {
    from: String,
    to: String,
    rates: BTreeMap<NaiveDate, f64>,
}

/// Last month of daily rates keyed by ISO date.
async fn chart(
    State(state): State<AppState>,
    Query(pair): Query<PairQuery>,
) -> Result<Json<Chart>, StatusCode> {
    let from = normalize_symbol(&pair.from);
    let to = normalize_symbol(&pair.to);
    let series = state
        .rates
        .monthly_series(&from, &to)
        .await
        .map_err(core_status)?;
    Ok(Json(Chart {
        from,
        to,
        rates: series.into_iter().map(|p| (p.date, p.rate)).collect(),
    }))
}
