use std::{collections::HashSet, sync::Arc, time::Duration};

use alert_engine::{AlertCheck, AlertEvaluator, AlertNotifier, AlertRepository};
use domain::{Alert, CoreResult};
use tokio::{sync::Mutex, time::sleep};
use tracing::{debug, warn};
use uuid::Uuid;

type AlertKey = (Uuid, String, String);

fn key(alert: &Alert) -> AlertKey {
    (
        alert.user_id,
        alert.from_currency.clone(),
        alert.to_currency.clone(),
    )
}

/// Periodically evaluates every stored alert and notifies when one becomes
/// active. An alert that stays active is not re-notified until it has been
/// inactive for at least one pass. Alerts that cannot be checked on a pass
/// keep the state they had on the previous one.
pub struct AlertMonitor {
    repo: Arc<dyn AlertRepository>,
    evaluator: AlertEvaluator,
    notifier: Arc<dyn AlertNotifier>,
    active: Mutex<HashSet<AlertKey>>,
}

impl AlertMonitor {
    pub fn new(
        repo: Arc<dyn AlertRepository>,
        evaluator: AlertEvaluator,
        notifier: Arc<dyn AlertNotifier>,
    ) -> Self {
        Self {
            repo,
            evaluator,
            notifier,
            active: Mutex::new(HashSet::new()),
        }
    }

    pub fn spawn(self: Arc<Self>, interval: Duration) {
        tokio::spawn(async move {
            loop {
                if let Err(err) = self.run_once().await {
                    warn!(error = %err, "alert monitor run failed");
                }
                sleep(interval).await;
            }
        });
    }

    /// One pass over all users; returns how many notifications were sent.
    pub async fn run_once(&self) -> CoreResult<usize> {
        let mut now_active = HashSet::new();
        let mut notified = 0;
        let previously_active = self.active.lock().await.clone();

        for user_id in self.repo.list_user_ids().await? {
            let alerts = match self.repo.list_alerts(user_id).await {
                Ok(alerts) => alerts,
                Err(err) => {
                    warn!(error = %err, %user_id, "failed to load alerts");
                    now_active.extend(
                        previously_active
                            .iter()
                            .filter(|(owner, _, _)| *owner == user_id)
                            .cloned(),
                    );
                    continue;
                }
            };
            for (alert, check) in self.evaluator.check(alerts).await {
                let key = key(&alert);
                match check {
                    AlertCheck::Active(rate) => {
                        if !previously_active.contains(&key) {
                            self.notifier.notify(&alert, rate).await;
                            metrics::counter!("alerts_notified_total").increment(1);
                            notified += 1;
                        }
                        now_active.insert(key);
                    }
                    AlertCheck::Unavailable if previously_active.contains(&key) => {
                        now_active.insert(key);
                    }
                    AlertCheck::Unavailable | AlertCheck::Inactive => {}
                }
            }
        }

        debug!(active = now_active.len(), notified, "alert monitor pass finished");
        *self.active.lock().await = now_active;
        Ok(notified)
    }
}
