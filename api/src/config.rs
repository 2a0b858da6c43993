use std::{env, time::Duration};

use anyhow::{Context, Result};
use axum_extra::extract::cookie::SameSite;
use domain::normalize_symbol;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub rates_api_base: String,
    pub rates_timeout: Duration,
    pub local_currency: String,
    pub rate_lookup_concurrency: usize,
    pub alert_poll_interval: Duration,
    pub enable_alert_worker: bool,
    pub rate_pairs: Vec<(String, String)>,
    pub frontend_origins: Vec<String>,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let cookie_secure = parse_bool("COOKIE_SECURE", false);

        if is_production_environment() && !cookie_secure {
            tracing::warn!(
                "COOKIE_SECURE=false in production; the bearer token cookie will travel over plain HTTP"
            );
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set for API server")?,
            rates_api_base: env::var("RATES_API_BASE")
                .unwrap_or_else(|_| "https://api.frankfurter.app".to_string()),
            rates_timeout: parse_duration_seconds("RATES_TIMEOUT_SECS", 10),
            local_currency: env::var("LOCAL_CURRENCY")
                .map(|v| normalize_symbol(&v))
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "CAD".to_string()),
            rate_lookup_concurrency: parse_usize("RATE_LOOKUP_CONCURRENCY", 4),
            alert_poll_interval: parse_duration_seconds("ALERT_POLL_INTERVAL_SECS", 60),
            enable_alert_worker: parse_bool("ENABLE_ALERT_WORKER", false),
            rate_pairs: parse_rate_pairs(
                &env::var("RATE_PAIRS").unwrap_or_else(|_| "USD:CAD,EUR:CAD".to_string()),
            ),
            frontend_origins: parse_origins(),
            cookie_secure,
            cookie_same_site: parse_same_site(&env::var("COOKIE_SAMESITE").ok()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8081".to_string())
                .parse()
                .context("PORT must be a valid u16")?,
        })
    }
}

fn is_production_environment() -> bool {
    env::var("ENVIRONMENT")
        .or_else(|_| env::var("ENV"))
        .map(|e| {
            let lower = e.to_lowercase();
            lower == "production" || lower == "prod"
        })
        .unwrap_or(false)
}

fn parse_origins() -> Vec<String> {
    if let Ok(list) = env::var("FRONTEND_ORIGINS") {
        split_origins(&list)
    } else if let Ok(origin) = env::var("FRONTEND_ORIGIN") {
        split_origins(&origin)
    } else {
        vec!["http://localhost:3000".to_string()]
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|item| {
            let trimmed = item.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Parses `FROM:TO` pairs separated by commas, e.g. `USD:CAD,EUR:CAD`.
pub fn parse_rate_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|item| {
            let (from, to) = item.split_once(':')?;
            let from = normalize_symbol(from);
            let to = normalize_symbol(to);
            if from.is_empty() || to.is_empty() {
                return None;
            }
            Some((from, to))
        })
        .collect()
}

fn parse_duration_seconds(key: &str, default: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default))
}

fn parse_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn parse_same_site(value: &Option<String>) -> SameSite {
    match value.as_ref().map(|v| v.trim().to_lowercase()).as_deref() {
        Some("strict") => SameSite::Strict,
        Some("none") => SameSite::None,
        _ => SameSite::Lax,
    }
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_pairs_skip_malformed_items() {
        let pairs = parse_rate_pairs("usd:cad, EUR:CAD ,GBP,:JPY,");
        assert_eq!(
            pairs,
            vec![
                ("USD".to_string(), "CAD".to_string()),
                ("EUR".to_string(), "CAD".to_string()),
            ]
        );
    }

    #[test]
    fn origins_are_trimmed() {
        assert_eq!(
            split_origins(" http://a.test ,,http://b.test"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn same_site_defaults_to_lax() {
        assert_eq!(parse_same_site(&None), SameSite::Lax);
        assert_eq!(parse_same_site(&Some("Strict".into())), SameSite::Strict);
        assert_eq!(parse_same_site(&Some("none".into())), SameSite::None);
    }
}
