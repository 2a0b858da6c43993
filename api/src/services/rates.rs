use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Months, NaiveDate, Utc};
use domain::{normalize_symbol, CoreError, CoreResult, RatePoint};
use rates::RateProvider;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

/// Rates from a Frankfurter-compatible HTTP API (ECB reference rates).
#[derive(Clone)]
pub struct FrankfurterRateProvider {
    client: Client,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    rates: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    rates: BTreeMap<NaiveDate, HashMap<String, f64>>,
}

impl FrankfurterRateProvider {
    pub fn new(api_base: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build rate API client")?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str, from: &str, to: &str) -> CoreResult<T> {
        let url = format!("{}/{}", self.api_base, path);
        let resp = self
            .client
            .get(&url)
            .query(&[("from", from), ("to", to)])
            .send()
            .await
            .map_err(|err| CoreError::upstream(format!("rate API request failed: {err}")))?;

        let status = resp.status();
        debug!(%url, %from, %to, status = status.as_u16(), "rate API response");
        if status == StatusCode::NOT_FOUND || status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(CoreError::UnknownCurrency(format!("{from}/{to}")));
        }
        if !status.is_success() {
            return Err(CoreError::upstream(format!(
                "rate API returned status {status}"
            )));
        }

        resp.json::<T>()
            .await
            .map_err(|err| CoreError::upstream(format!("failed to decode rate response: {err}")))
    }
}

#[async_trait]
impl RateProvider for FrankfurterRateProvider {
    async fn current_rate(&self, from: &str, to: &str) -> CoreResult<f64> {
        let from = normalize_symbol(from);
        let to = normalize_symbol(to);
        if from == to {
            return Ok(1.0);
        }

        let body: LatestResponse = self.fetch("latest", &from, &to).await?;
        body.rates
            .get(&to)
            .copied()
            .ok_or_else(|| CoreError::UnknownCurrency(format!("{from}/{to}")))
    }

    async fn monthly_series(&self, from: &str, to: &str) -> CoreResult<Vec<RatePoint>> {
        let from = normalize_symbol(from);
        let to = normalize_symbol(to);
        let end = Utc::now().date_naive();
        if from == to {
            return Ok(vec![RatePoint {
                date: end,
                rate: 1.0,
            }]);
        }

        let start = end.checked_sub_months(Months::new(1)).unwrap_or(end);
        let body: SeriesResponse = self
            .fetch(&format!("{start}..{end}"), &from, &to)
            .await?;
        series_points(body, &to)
    }
}

fn series_points(body: SeriesResponse, to: &str) -> CoreResult<Vec<RatePoint>> {
    let points: Vec<RatePoint> = body
        .rates
        .into_iter()
        .filter_map(|(date, rates)| rates.get(to).map(|rate| RatePoint { date, rate: *rate }))
        .collect();
    if points.is_empty() {
        return Err(CoreError::UnknownCurrency(to.to_string()));
    }
    Ok(points)
}
