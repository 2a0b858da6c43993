use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("invalid token")]
    InvalidToken,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("unknown currency: {0}")]
    UnknownCurrency(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        CoreError::UpstreamUnavailable(err.to_string())
    }
}

/// Trims and upper-cases a currency symbol so it can be used as a key.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Currency {
    pub symbol: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Alert {
    pub user_id: Uuid,
    pub name: String,
    pub from_currency: String,
    pub to_currency: String,
    pub threshold: f64,
    pub is_below: bool,
    pub created_on: NaiveDate,
}

impl Alert {
    pub fn pair(&self) -> String {
        format!("{}/{}", self.from_currency, self.to_currency)
    }
}

/// Alert fields supplied by a caller. The owner always comes from the
/// verified token, never from the payload.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AlertDraft {
    pub name: String,
    pub from_currency: String,
    pub to_currency: String,
    pub threshold: f64,
    #[serde(default)]
    pub is_below: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PortfolioEntry {
    pub user_id: Uuid,
    pub currency_symbol: String,
    pub quantity: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PortfolioEntryRequest {
    pub currency_symbol: String,
    pub quantity: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PortfolioValuation {
    pub currency: String,
    pub total: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct RatePoint {
    pub date: NaiveDate,
    pub rate: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Conversion {
    pub from: String,
    pub to: String,
    pub rate: f64,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
}
