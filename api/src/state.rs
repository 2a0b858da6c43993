use std::sync::Arc;

use alert_engine::AlertService;
use auth::AuthService;
use portfolio_engine::PortfolioService;
use rates::{CurrencyRepository, RateProvider};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub auth: Arc<dyn AuthService>,
    pub alerts: Arc<dyn AlertService>,
    pub portfolio: Arc<dyn PortfolioService>,
    pub rates: Arc<dyn RateProvider>,
    pub currencies: Arc<dyn CurrencyRepository>,
}

// Ensure critical dependencies uphold Send/Sync for Axum state usage.
#[allow(dead_code)]
fn _assert_state_types_are_send_sync()
where
    AppConfig: Send + Sync + 'static,
    dyn AuthService: Send + Sync,
    dyn AlertService: Send + Sync,
    dyn PortfolioService: Send + Sync,
    dyn RateProvider: Send + Sync,
    dyn CurrencyRepository: Send + Sync,
{
}

#[allow(dead_code)]
fn _assert_state_bounds() {
    fn assert_bounds<T: Clone + Send + Sync + 'static>() {}
    assert_bounds::<AppState>();
}
