pub mod alerts;
pub mod auth;
pub mod health;
pub mod portfolio;
pub mod rates;

use ::auth::AuthError;
use axum::http::StatusCode;
use domain::CoreError;
use serde::Deserialize;

/// `?from=USD&to=CAD`
#[derive(Debug, Deserialize)]
pub struct PairQuery {
    pub from: String,
    pub to: String,
}

pub(crate) fn core_status(err: CoreError) -> StatusCode {
    match err {
        CoreError::InvalidToken => StatusCode::UNAUTHORIZED,
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::AlreadyExists(_) => StatusCode::CONFLICT,
        CoreError::UnknownCurrency(_) => StatusCode::BAD_REQUEST,
        CoreError::UpstreamUnavailable(reason) => {
            tracing::warn!(%reason, "upstream dependency failed");
            StatusCode::BAD_GATEWAY
        }
    }
}

pub(crate) fn auth_status(err: AuthError) -> StatusCode {
    match err {
        AuthError::UserNotFound => StatusCode::NOT_FOUND,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::Core(inner) => core_status(inner),
    }
}
