use std::sync::Arc;

use alert_engine::{AlertEvaluator, AlertRepository, LoggingNotifier, StoredAlertService};
use anyhow::Result;
use auth::{BcryptPasswordVerifier, TokenAuthService, UserDirectory};
use portfolio_engine::{PortfolioRepository, PortfolioValuator};
use rates::{CurrencyRepository, RateProvider};
use sqlx::postgres::PgPoolOptions;

use crate::{
    config::AppConfig,
    repositories::{
        PostgresAlertRepository, PostgresCurrencyRepository, PostgresPortfolioRepository,
        PostgresUserRepository,
    },
    services::{AlertMonitor, FrankfurterRateProvider},
    state::AppState,
};

/// Storage and rate sources the services are built on.
#[derive(Clone)]
pub struct Collaborators {
    pub users: Arc<dyn UserDirectory>,
    pub alerts: Arc<dyn AlertRepository>,
    pub portfolio: Arc<dyn PortfolioRepository>,
    pub currencies: Arc<dyn CurrencyRepository>,
    pub rates: Arc<dyn RateProvider>,
}

/// Wires services over `deps` without touching the network or database.
pub fn assemble_state(config: &AppConfig, deps: Collaborators) -> AppState {
    let auth_service = TokenAuthService::new(deps.users, Arc::new(BcryptPasswordVerifier));
    let alert_service = StoredAlertService::new(
        deps.alerts,
        deps.currencies.clone(),
        AlertEvaluator::new(deps.rates.clone(), config.rate_lookup_concurrency),
    );
    let portfolio_service = PortfolioValuator::new(
        deps.portfolio,
        deps.currencies.clone(),
        deps.rates.clone(),
        config.rate_lookup_concurrency,
    );

    AppState {
        config: config.clone(),
        auth: Arc::new(auth_service),
        alerts: Arc::new(alert_service),
        portfolio: Arc::new(portfolio_service),
        rates: deps.rates,
        currencies: deps.currencies,
    }
}

pub async fn build_state(config: &AppConfig) -> Result<AppState> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("../migrations").run(&pool).await?;

    let rates: Arc<dyn RateProvider> = Arc::new(FrankfurterRateProvider::new(
        config.rates_api_base.clone(),
        config.rates_timeout,
    )?);
    let alert_repo: Arc<dyn AlertRepository> = Arc::new(PostgresAlertRepository::new(pool.clone()));

    if config.enable_alert_worker {
        let monitor = Arc::new(AlertMonitor::new(
            alert_repo.clone(),
            AlertEvaluator::new(rates.clone(), config.rate_lookup_concurrency),
            Arc::new(LoggingNotifier),
        ));
        monitor.spawn(config.alert_poll_interval);
        tracing::info!(
            interval_secs = config.alert_poll_interval.as_secs(),
            "alert monitor started"
        );
    }

    Ok(assemble_state(
        config,
        Collaborators {
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            alerts: alert_repo,
            portfolio: Arc::new(PostgresPortfolioRepository::new(pool.clone())),
            currencies: Arc::new(PostgresCurrencyRepository::new(pool)),
            rates,
        },
    ))
}
