use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use domain::{LoginRequest, LoginResponse};
use serde::Serialize;

use super::auth_status;
use crate::{
    auth_middleware::{CurrentUser, AUTH_TOKEN_COOKIE},
    config::AppConfig,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/isLogin", get(is_login))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), StatusCode> {
    let login = state.auth.login(payload).await.map_err(auth_status)?;
    tracing::info!(user_id = %login.user_id, "login succeeded");
    let jar = jar.add(token_cookie(login.token.clone(), &state.config));
    Ok((jar, Json(login)))
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, StatusCode) {
    let mut cookie = token_cookie(String::new(), &state.config);
    cookie.make_removal();
    (jar.add(cookie), StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct LoginStatus {
    login: bool,
}

async fn is_login(
    user: Result<CurrentUser, StatusCode>,
) -> Result<Json<LoginStatus>, StatusCode> {
    let login = match user {
        Ok(_) => true,
        Err(StatusCode::UNAUTHORIZED) => false,
        Err(status) => return Err(status),
    };
    Ok(Json(LoginStatus { login }))
}

/// Session cookie; the token itself never expires.
fn token_cookie(value: String, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((AUTH_TOKEN_COOKIE, value))
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(config.cookie_same_site)
        .path("/")
        .build()
}
