use auth::AuthError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use axum_extra::{
    extract::cookie::CookieJar,
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeader,
};
use domain::{CoreError, User};
use uuid::Uuid;

use crate::{routes::auth_status, state::AppState};

pub const AUTH_TOKEN_COOKIE: &str = "fxw_token";

/// The caller resolved from its bearer token. Handlers take the user id from
/// here and nowhere else.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }
}

/// Bearer header first, then the token cookie.
async fn request_token(parts: &mut Parts, state: &AppState) -> Option<String> {
    if let Ok(TypedHeader(Authorization(bearer))) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await
    {
        return Some(bearer.token().to_string());
    }

    CookieJar::from_request_parts(parts, state)
        .await
        .ok()
        .and_then(|jar| {
            jar.get(AUTH_TOKEN_COOKIE)
                .map(|cookie| cookie.value().to_owned())
        })
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = request_token(parts, state)
            .await
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let outcome = state.auth.authenticate(&token).await;
        let label = match &outcome {
            Ok(_) => "matched",
            Err(AuthError::Core(CoreError::InvalidToken)) => "rejected",
            Err(_) => "error",
        };
        metrics::counter!("token_verifications_total", "outcome" => label).increment(1);

        outcome.map(CurrentUser).map_err(auth_status)
    }
}
