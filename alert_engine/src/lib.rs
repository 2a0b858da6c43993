use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use domain::{normalize_symbol, Alert, AlertDraft, CoreError, CoreResult};
use futures::{stream, StreamExt};
use rates::{ensure_known_currency, CurrencyRepository, RateProvider};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Rounds to cents (ties to even) and floors at zero.
pub fn normalize_threshold(value: f64) -> f64 {
    let rounded = (value * 100.0).round_ties_even() / 100.0;
    if rounded.is_nan() || rounded <= 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Strict comparison against the threshold; a rate equal to the threshold
/// never triggers.
pub fn is_active(alert: &Alert, current_rate: f64) -> bool {
    if alert.is_below {
        current_rate < alert.threshold
    } else {
        current_rate > alert.threshold
    }
}

#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn find_alert(&self, user_id: Uuid, from: &str, to: &str) -> CoreResult<Option<Alert>>;
    async fn list_alerts(&self, user_id: Uuid) -> CoreResult<Vec<Alert>>;
    async fn list_user_ids(&self) -> CoreResult<Vec<Uuid>>;
    async fn create_alert(&self, alert: &Alert) -> CoreResult<()>;
    async fn update_alert(&self, alert: &Alert) -> CoreResult<bool>;
    async fn delete_alert(&self, user_id: Uuid, from: &str, to: &str) -> CoreResult<bool>;
}

#[derive(Clone)]
pub struct AlertEvaluator {
    rates: Arc<dyn RateProvider>,
    concurrency: usize,
}

impl AlertEvaluator {
    pub fn new(rates: Arc<dyn RateProvider>, concurrency: usize) -> Self {
        Self {
            rates,
            concurrency: concurrency.max(1),
        }
    }

    /// Keeps the alerts whose condition holds against a fresh rate lookup,
    /// in input order. Alerts whose lookup fails are dropped.
    pub async fn filter_active(&self, alerts: Vec<Alert>) -> Vec<Alert> {
        self.evaluate(alerts)
            .await
            .into_iter()
            .map(|(alert, _)| alert)
            .collect()
    }

    /// Like [`filter_active`](Self::filter_active), paired with the rate that
    /// triggered each alert.
    pub async fn evaluate(&self, alerts: Vec<Alert>) -> Vec<(Alert, f64)> {
        self.check(alerts)
            .await
            .into_iter()
            .filter_map(|(alert, check)| match check {
                AlertCheck::Active(rate) => Some((alert, rate)),
                AlertCheck::Inactive | AlertCheck::Unavailable => None,
            })
            .collect()
    }

    /// Outcome of a fresh lookup for every alert, in input order.
    pub async fn check(&self, alerts: Vec<Alert>) -> Vec<(Alert, AlertCheck)> {
        let lookups = alerts.into_iter().map(|alert| {
            let rates = self.rates.clone();
            async move {
                let rate = rates
                    .current_rate(&alert.from_currency, &alert.to_currency)
                    .await;
                (alert, rate)
            }
        });
        stream::iter(lookups)
            .buffered(self.concurrency)
            .map(|(alert, rate)| {
                let check = match rate {
                    Ok(rate) if is_active(&alert, rate) => AlertCheck::Active(rate),
                    Ok(_) => AlertCheck::Inactive,
                    Err(err) => {
                        metrics::counter!("rate_lookup_failures_total").increment(1);
                        warn!(
                            error = %err,
                            user_id = %alert.user_id,
                            pair = %alert.pair(),
                            "rate lookup failed, skipping alert"
                        );
                        AlertCheck::Unavailable
                    }
                };
                (alert, check)
            })
            .collect()
            .await
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertCheck {
    /// Condition holds at this rate.
    Active(f64),
    Inactive,
    /// The rate lookup failed.
    Unavailable,
}

#[async_trait]
pub trait AlertService: Send + Sync {
    async fn list_alerts(&self, user_id: Uuid) -> CoreResult<Vec<Alert>>;
    async fn active_alerts(&self, user_id: Uuid) -> CoreResult<Vec<Alert>>;
    async fn create_alert(&self, user_id: Uuid, draft: AlertDraft) -> CoreResult<Alert>;
    async fn update_alert(&self, user_id: Uuid, draft: AlertDraft) -> CoreResult<Alert>;
    async fn delete_alert(&self, user_id: Uuid, from: &str, to: &str) -> CoreResult<()>;
}

#[derive(Clone)]
pub struct StoredAlertService {
    repo: Arc<dyn AlertRepository>,
    currencies: Arc<dyn CurrencyRepository>,
    evaluator: AlertEvaluator,
}

impl StoredAlertService {
    pub fn new(
        repo: Arc<dyn AlertRepository>,
        currencies: Arc<dyn CurrencyRepository>,
        evaluator: AlertEvaluator,
    ) -> Self {
        Self {
            repo,
            currencies,
            evaluator,
        }
    }

    fn build_alert(user_id: Uuid, draft: AlertDraft) -> Alert {
        Alert {
            user_id,
            name: draft.name,
            from_currency: normalize_symbol(&draft.from_currency),
            to_currency: normalize_symbol(&draft.to_currency),
            threshold: normalize_threshold(draft.threshold),
            is_below: draft.is_below,
            created_on: Utc::now().date_naive(),
        }
    }
}

#[async_trait]
impl AlertService for StoredAlertService {
    async fn list_alerts(&self, user_id: Uuid) -> CoreResult<Vec<Alert>> {
        self.repo.list_alerts(user_id).await
    }

    async fn active_alerts(&self, user_id: Uuid) -> CoreResult<Vec<Alert>> {
        let alerts = self.repo.list_alerts(user_id).await?;
        Ok(self.evaluator.filter_active(alerts).await)
    }

    async fn create_alert(&self, user_id: Uuid, draft: AlertDraft) -> CoreResult<Alert> {
        let alert = Self::build_alert(user_id, draft);
        if self
            .repo
            .find_alert(user_id, &alert.from_currency, &alert.to_currency)
            .await?
            .is_some()
        {
            return Err(CoreError::AlreadyExists(format!("alert {}", alert.pair())));
        }
        ensure_known_currency(self.currencies.as_ref(), &alert.from_currency).await?;
        ensure_known_currency(self.currencies.as_ref(), &alert.to_currency).await?;

        self.repo.create_alert(&alert).await?;
        info!(%user_id, pair = %alert.pair(), "alert created");
        Ok(alert)
    }

    async fn update_alert(&self, user_id: Uuid, draft: AlertDraft) -> CoreResult<Alert> {
        let alert = Self::build_alert(user_id, draft);
        if !self.repo.update_alert(&alert).await? {
            return Err(CoreError::NotFound(format!("alert {}", alert.pair())));
        }
        info!(%user_id, pair = %alert.pair(), "alert updated");
        Ok(alert)
    }

    async fn delete_alert(&self, user_id: Uuid, from: &str, to: &str) -> CoreResult<()> {
        let from = normalize_symbol(from);
        let to = normalize_symbol(to);
        if !self.repo.delete_alert(user_id, &from, &to).await? {
            return Err(CoreError::NotFound(format!("alert {from}/{to}")));
        }
        info!(%user_id, pair = %format!("{from}/{to}"), "alert deleted");
        Ok(())
    }
}

#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn notify(&self, alert: &Alert, current_rate: f64);
}

#[derive(Clone, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl AlertNotifier for LoggingNotifier {
    async fn notify(&self, alert: &Alert, current_rate: f64) {
        info!(
            user_id = %alert.user_id,
            name = %alert.name,
            pair = %alert.pair(),
            threshold = alert.threshold,
            is_below = alert.is_below,
            current_rate,
            "ALERT active"
        );
    }
}

#[derive(Default)]
pub struct InMemoryAlertRepository {
    alerts: RwLock<Vec<Alert>>,
}

impl InMemoryAlertRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn same_key(alert: &Alert, user_id: Uuid, from: &str, to: &str) -> bool {
    alert.user_id == user_id && alert.from_currency == from && alert.to_currency == to
}

#[async_trait]
impl AlertRepository for InMemoryAlertRepository {
    async fn find_alert(&self, user_id: Uuid, from: &str, to: &str) -> CoreResult<Option<Alert>> {
        let alerts = self.alerts.read().await;
        Ok(alerts
            .iter()
            .find(|a| same_key(a, user_id, from, to))
            .cloned())
    }

    async fn list_alerts(&self, user_id: Uuid) -> CoreResult<Vec<Alert>> {
        let alerts = self.alerts.read().await;
        Ok(alerts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_user_ids(&self) -> CoreResult<Vec<Uuid>> {
        let alerts = self.alerts.read().await;
        let mut ids: Vec<Uuid> = Vec::new();
        for alert in alerts.iter() {
            if !ids.contains(&alert.user_id) {
                ids.push(alert.user_id);
            }
        }
        Ok(ids)
    }

    async fn create_alert(&self, alert: &Alert) -> CoreResult<()> {
        let mut alerts = self.alerts.write().await;
        if alerts
            .iter()
            .any(|a| same_key(a, alert.user_id, &alert.from_currency, &alert.to_currency))
        {
            return Err(CoreError::AlreadyExists(format!("alert {}", alert.pair())));
        }
        alerts.push(alert.clone());
        Ok(())
    }

    async fn update_alert(&self, alert: &Alert) -> CoreResult<bool> {
        let mut alerts = self.alerts.write().await;
        match alerts
            .iter_mut()
            .find(|a| same_key(a, alert.user_id, &alert.from_currency, &alert.to_currency))
        {
            Some(existing) => {
                *existing = alert.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_alert(&self, user_id: Uuid, from: &str, to: &str) -> CoreResult<bool> {
        let mut alerts = self.alerts.write().await;
        let before = alerts.len();
        alerts.retain(|a| !same_key(a, user_id, from, to));
        Ok(alerts.len() < before)
    }
}
