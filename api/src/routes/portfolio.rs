use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use domain::{PortfolioEntry, PortfolioEntryRequest, PortfolioValuation};
use serde::{Deserialize, Serialize};

use super::core_status;
use crate::{auth_middleware::CurrentUser, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/portfolio",
            get(list_entries).put(upsert_entry).delete(remove_entry),
        )
        .route("/portfolio/sum", get(portfolio_sum))
}

#[derive(Debug, Deserialize)]
struct SymbolQuery {
    symbol: String,
}

#[derive(Serialize)]
struct Removal {
    deleted: bool,
}

async fn list_entries(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<PortfolioEntry>>, StatusCode> {
    state
        .portfolio
        .list_entries(user.id())
        .await
        .map(Json)
        .map_err(core_status)
}

async fn upsert_entry(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<PortfolioEntryRequest>,
) -> Result<Json<PortfolioEntry>, StatusCode> {
    if !payload.quantity.is_finite() {
        return Err(StatusCode::BAD_REQUEST);
    }
    state
        .portfolio
        .upsert_entry(user.id(), &payload.currency_symbol, payload.quantity)
        .await
        .map(Json)
        .map_err(core_status)
}

async fn remove_entry(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<Removal>, StatusCode> {
    let deleted = state
        .portfolio
        .remove_entry(user.id(), &query.symbol)
        .await
        .map_err(core_status)?;
    Ok(Json(Removal { deleted }))
}

async fn portfolio_sum(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<PortfolioValuation>, StatusCode> {
    state
        .portfolio
        .valuation(user.id(), &state.config.local_currency)
        .await
        .map(Json)
        .map_err(core_status)
}
