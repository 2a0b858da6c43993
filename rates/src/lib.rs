use std::collections::HashMap;

use async_trait::async_trait;
use domain::{normalize_symbol, CoreError, CoreResult, Currency, RatePoint};
use tokio::sync::RwLock;

/// Source of live and historical exchange rates.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn current_rate(&self, from: &str, to: &str) -> CoreResult<f64>;
    /// Daily rates over the last month, oldest first.
    async fn monthly_series(&self, from: &str, to: &str) -> CoreResult<Vec<RatePoint>>;
}

#[async_trait]
pub trait CurrencyRepository: Send + Sync {
    async fn find_currency(&self, symbol: &str) -> CoreResult<Option<Currency>>;
    async fn list_currencies(&self) -> CoreResult<Vec<Currency>>;
}

/// Fails with `UnknownCurrency` unless `symbol` is in the catalog.
pub async fn ensure_known_currency(
    currencies: &dyn CurrencyRepository,
    symbol: &str,
) -> CoreResult<Currency> {
    currencies
        .find_currency(symbol)
        .await?
        .ok_or_else(|| CoreError::UnknownCurrency(normalize_symbol(symbol)))
}

#[derive(Clone, Default)]
pub struct StaticRateProvider {
    rates: HashMap<(String, String), f64>,
    series: HashMap<(String, String), Vec<RatePoint>>,
}

impl StaticRateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, from: &str, to: &str, rate: f64) -> Self {
        self.rates
            .insert((normalize_symbol(from), normalize_symbol(to)), rate);
        self
    }

    pub fn with_series(mut self, from: &str, to: &str, points: Vec<RatePoint>) -> Self {
        self.series
            .insert((normalize_symbol(from), normalize_symbol(to)), points);
        self
    }

    fn lookup(&self, from: &str, to: &str) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }
        if let Some(rate) = self.rates.get(&(from.to_string(), to.to_string())) {
            return Some(*rate);
        }
        self.rates
            .get(&(to.to_string(), from.to_string()))
            .filter(|rate| **rate != 0.0)
            .map(|rate| 1.0 / rate)
    }
}

#[async_trait]
impl RateProvider for StaticRateProvider {
    async fn current_rate(&self, from: &str, to: &str) -> CoreResult<f64> {
        let from = normalize_symbol(from);
        let to = normalize_symbol(to);
        self.lookup(&from, &to)
            .ok_or_else(|| CoreError::UnknownCurrency(format!("{from}/{to}")))
    }

    async fn monthly_series(&self, from: &str, to: &str) -> CoreResult<Vec<RatePoint>> {
        let key = (normalize_symbol(from), normalize_symbol(to));
        if let Some(points) = self.series.get(&key) {
            let mut points = points.clone();
            points.sort_by_key(|p| p.date);
            return Ok(points);
        }
        // Pairs without a recorded series still need to be valid pairs.
        let rate = self.lookup(&key.0, &key.1).ok_or_else(|| {
            CoreError::UnknownCurrency(format!("{}/{}", key.0, key.1))
        })?;
        Ok(vec![RatePoint {
            date: chrono::Utc::now().date_naive(),
            rate,
        }])
    }
}

#[derive(Default)]
pub struct InMemoryCurrencyRepository {
    currencies: RwLock<Vec<Currency>>,
}

impl InMemoryCurrencyRepository {
    pub fn new(currencies: Vec<Currency>) -> Self {
        Self {
            currencies: RwLock::new(currencies),
        }
    }

    pub fn with_symbols(symbols: &[&str]) -> Self {
        Self::new(
            symbols
                .iter()
                .map(|symbol| Currency {
                    symbol: normalize_symbol(symbol),
                    name: normalize_symbol(symbol),
                })
                .collect(),
        )
    }
}

#[async_trait]
impl CurrencyRepository for InMemoryCurrencyRepository {
    async fn find_currency(&self, symbol: &str) -> CoreResult<Option<Currency>> {
        let symbol = normalize_symbol(symbol);
        let currencies = self.currencies.read().await;
        Ok(currencies.iter().find(|c| c.symbol == symbol).cloned())
    }

    async fn list_currencies(&self) -> CoreResult<Vec<Currency>> {
        Ok(self.currencies.read().await.clone())
    }
}
