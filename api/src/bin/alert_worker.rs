use std::time::Duration;

use api::{bootstrap::build_state, config::AppConfig, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing()?;

    // The worker process exists only to run the alert monitor.
    let mut config = AppConfig::from_env()?;
    config.enable_alert_worker = true;
    let _state = build_state(&config).await?;
    tracing::info!(
        interval_secs = config.alert_poll_interval.as_secs(),
        "alert worker started"
    );

    loop {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
}
