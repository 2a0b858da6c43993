use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use domain::{Alert, AlertDraft};

use super::{core_status, PairQuery};
use crate::{auth_middleware::CurrentUser, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/alert",
            get(list_alerts)
                .post(create_alert)
                .put(update_alert)
                .delete(delete_alert),
        )
        .route("/alert/active", get(active_alerts))
}

async fn list_alerts(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Alert>>, StatusCode> {
    state
        .alerts
        .list_alerts(user.id())
        .await
        .map(Json)
        .map_err(core_status)
}

async fn active_alerts(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Alert>>, StatusCode> {
    state
        .alerts
        .active_alerts(user.id())
        .await
        .map(Json)
        .map_err(core_status)
}

async fn create_alert(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(draft): Json<AlertDraft>,
) -> Result<(StatusCode, Json<Alert>), StatusCode> {
    let alert = state
        .alerts
        .create_alert(user.id(), draft)
        .await
        .map_err(core_status)?;
    Ok((StatusCode::CREATED, Json(alert)))
}

async fn update_alert(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(draft): Json<AlertDraft>,
) -> Result<Json<Alert>, StatusCode> {
    state
        .alerts
        .update_alert(user.id(), draft)
        .await
        .map(Json)
        .map_err(core_status)
}

async fn delete_alert(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pair): Query<PairQuery>,
) -> Result<StatusCode, StatusCode> {
    state
        .alerts
        .delete_alert(user.id(), &pair.from, &pair.to)
        .await
        .map_err(core_status)?;
    Ok(StatusCode::NO_CONTENT)
}
