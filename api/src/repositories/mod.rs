pub mod alert_repository;
pub mod currency_repository;
pub mod portfolio_repository;
pub mod user_repository;

pub use alert_repository::PostgresAlertRepository;
pub use currency_repository::PostgresCurrencyRepository;
pub use portfolio_repository::PostgresPortfolioRepository;
pub use user_repository::PostgresUserRepository;

use domain::CoreError;

/// Database failures surface to the core as an unavailable dependency.
pub(crate) fn db_err(err: sqlx::Error) -> CoreError {
    CoreError::upstream(format!("database error: {err}"))
}
