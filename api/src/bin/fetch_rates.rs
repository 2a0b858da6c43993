use api::{config::AppConfig, services::FrankfurterRateProvider, telemetry};
use rates::RateProvider;

/// Prints the current rate for every `RATE_PAIRS` entry.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing()?;
    let config = AppConfig::from_env()?;

    let provider =
        FrankfurterRateProvider::new(config.rates_api_base.clone(), config.rates_timeout)?;

    let mut failures = 0usize;
    for (from, to) in &config.rate_pairs {
        match provider.current_rate(from, to).await {
            Ok(rate) => {
                tracing::info!(%from, %to, rate, "rate fetched");
                println!("{from}/{to} {rate}");
            }
            Err(err) => {
                failures += 1;
                tracing::warn!(%from, %to, %err, "rate fetch failed");
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} rate lookups failed", config.rate_pairs.len());
    }
    Ok(())
}
