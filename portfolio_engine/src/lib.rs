use std::sync::Arc;

use async_trait::async_trait;
use domain::{normalize_symbol, CoreError, CoreResult, PortfolioEntry, PortfolioValuation};
use futures::{stream, StreamExt, TryStreamExt};
use rates::{ensure_known_currency, CurrencyRepository, RateProvider};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

#[async_trait]
pub trait PortfolioRepository: Send + Sync {
    async fn find_entry(&self, user_id: Uuid, symbol: &str) -> CoreResult<Option<PortfolioEntry>>;
    async fn list_entries(&self, user_id: Uuid) -> CoreResult<Vec<PortfolioEntry>>;
    async fn create_entry(&self, entry: &PortfolioEntry) -> CoreResult<()>;
    async fn update_entry(&self, entry: &PortfolioEntry) -> CoreResult<bool>;
    async fn delete_entry(&self, user_id: Uuid, symbol: &str) -> CoreResult<bool>;
}

/// Sums `quantity * rate(symbol -> local_currency)` over `entries`.
///
/// Lookups run up to `concurrency` at a time; the products are added in
/// input order so the result is reproducible. The first failed lookup
/// aborts the valuation.
pub async fn total_value(
    entries: &[PortfolioEntry],
    local_currency: &str,
    rates: Arc<dyn RateProvider>,
    concurrency: usize,
) -> CoreResult<f64> {
    let local_currency = local_currency.to_string();
    let lookups = entries.iter().cloned().map(move |entry| {
        let rates = rates.clone();
        let local_currency = local_currency.clone();
        async move {
            let rate = rates
                .current_rate(&entry.currency_symbol, &local_currency)
                .await?;
            Ok::<f64, CoreError>(rate * entry.quantity)
        }
    });
    let subtotals: Vec<f64> = stream::iter(lookups)
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    Ok(subtotals.iter().fold(0.0, |sum, subtotal| sum + subtotal))
}

#[async_trait]
pub trait PortfolioService: Send + Sync {
    async fn list_entries(&self, user_id: Uuid) -> CoreResult<Vec<PortfolioEntry>>;
    async fn upsert_entry(
        &self,
        user_id: Uuid,
        symbol: &str,
        quantity: f64,
    ) -> CoreResult<PortfolioEntry>;
    async fn remove_entry(&self, user_id: Uuid, symbol: &str) -> CoreResult<bool>;
    async fn valuation(&self, user_id: Uuid, local_currency: &str)
        -> CoreResult<PortfolioValuation>;
}

#[derive(Clone)]
pub struct PortfolioValuator {
    repo: Arc<dyn PortfolioRepository>,
    currencies: Arc<dyn CurrencyRepository>,
    rates: Arc<dyn RateProvider>,
    concurrency: usize,
}

impl PortfolioValuator {
    pub fn new(
        repo: Arc<dyn PortfolioRepository>,
        currencies: Arc<dyn CurrencyRepository>,
        rates: Arc<dyn RateProvider>,
        concurrency: usize,
    ) -> Self {
        Self {
            repo,
            currencies,
            rates,
            concurrency,
        }
    }
}

#[async_trait]
impl PortfolioService for PortfolioValuator {
    async fn list_entries(&self, user_id: Uuid) -> CoreResult<Vec<PortfolioEntry>> {
        self.repo.list_entries(user_id).await
    }

    async fn upsert_entry(
        &self,
        user_id: Uuid,
        symbol: &str,
        quantity: f64,
    ) -> CoreResult<PortfolioEntry> {
        let currency = ensure_known_currency(self.currencies.as_ref(), symbol).await?;
        let entry = PortfolioEntry {
            user_id,
            currency_symbol: currency.symbol,
            quantity,
        };

        if self
            .repo
            .find_entry(user_id, &entry.currency_symbol)
            .await?
            .is_some()
        {
            self.repo.update_entry(&entry).await?;
            debug!(%user_id, symbol = %entry.currency_symbol, quantity, "portfolio entry replaced");
        } else {
            self.repo.create_entry(&entry).await?;
            info!(%user_id, symbol = %entry.currency_symbol, quantity, "portfolio entry created");
        }
        Ok(entry)
    }

    async fn remove_entry(&self, user_id: Uuid, symbol: &str) -> CoreResult<bool> {
        let symbol = normalize_symbol(symbol);
        let removed = self.repo.delete_entry(user_id, &symbol).await?;
        debug!(%user_id, %symbol, removed, "portfolio entry removal");
        Ok(removed)
    }

    async fn valuation(
        &self,
        user_id: Uuid,
        local_currency: &str,
    ) -> CoreResult<PortfolioValuation> {
        let currency = normalize_symbol(local_currency);
        let entries = self.repo.list_entries(user_id).await?;
        let total = total_value(&entries, &currency, self.rates.clone(), self.concurrency).await?;
        Ok(PortfolioValuation { currency, total })
    }
}

#[derive(Default)]
pub struct InMemoryPortfolioRepository {
    entries: RwLock<Vec<PortfolioEntry>>,
}

impl InMemoryPortfolioRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PortfolioRepository for InMemoryPortfolioRepository {
    async fn find_entry(&self, user_id: Uuid, symbol: &str) -> CoreResult<Option<PortfolioEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .find(|e| e.user_id == user_id && e.currency_symbol == symbol)
            .cloned())
    }

    async fn list_entries(&self, user_id: Uuid) -> CoreResult<Vec<PortfolioEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_entry(&self, entry: &PortfolioEntry) -> CoreResult<()> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn update_entry(&self, entry: &PortfolioEntry) -> CoreResult<bool> {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|e| {
            e.user_id == entry.user_id && e.currency_symbol == entry.currency_symbol
        }) {
            Some(existing) => {
                existing.quantity = entry.quantity;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_entry(&self, user_id: Uuid, symbol: &str) -> CoreResult<bool> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| !(e.user_id == user_id && e.currency_symbol == symbol));
        Ok(entries.len() < before)
    }
}
