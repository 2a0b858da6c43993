use alert_engine::AlertRepository;
use async_trait::async_trait;
use domain::{Alert, CoreError, CoreResult};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::db_err;

#[derive(Clone)]
pub struct PostgresAlertRepository {
    pool: PgPool,
}

impl PostgresAlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ALERT_COLUMNS: &str =
    "user_id, name, from_currency, to_currency, threshold, is_below, created_on";

fn alert_from_row(row: &PgRow) -> Result<Alert, sqlx::Error> {
    Ok(Alert {
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        from_currency: row.try_get("from_currency")?,
        to_currency: row.try_get("to_currency")?,
        threshold: row.try_get::<f64, _>("threshold")?,
        is_below: row.try_get("is_below")?,
        created_on: row.try_get("created_on")?,
    })
}

#[async_trait]
impl AlertRepository for PostgresAlertRepository {
    async fn find_alert(&self, user_id: Uuid, from: &str, to: &str) -> CoreResult<Option<Alert>> {
        let row = sqlx::query(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts
             WHERE user_id = $1 AND from_currency = $2 AND to_currency = $3"
        ))
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(alert_from_row).transpose().map_err(db_err)
    }

    async fn list_alerts(&self, user_id: Uuid) -> CoreResult<Vec<Alert>> {
        let rows = sqlx::query(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts
             WHERE user_id = $1
             ORDER BY inserted_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter()
            .map(alert_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)
    }

    async fn list_user_ids(&self) -> CoreResult<Vec<Uuid>> {
        let rows = sqlx::query("SELECT DISTINCT user_id FROM alerts ORDER BY user_id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter()
            .map(|row| row.try_get("user_id"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)
    }

    async fn create_alert(&self, alert: &Alert) -> CoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO alerts (user_id, name, from_currency, to_currency, threshold, is_below, created_on)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (user_id, from_currency, to_currency) DO NOTHING",
        )
        .bind(alert.user_id)
        .bind(&alert.name)
        .bind(&alert.from_currency)
        .bind(&alert.to_currency)
        .bind(alert.threshold)
        .bind(alert.is_below)
        .bind(alert.created_on)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(CoreError::AlreadyExists(format!("alert {}", alert.pair())));
        }
        Ok(())
    }

    async fn update_alert(&self, alert: &Alert) -> CoreResult<bool> {
        let result = sqlx::query(
            "UPDATE alerts
             SET name = $4, threshold = $5, is_below = $6, created_on = $7
             WHERE user_id = $1 AND from_currency = $2 AND to_currency = $3",
        )
        .bind(alert.user_id)
        .bind(&alert.from_currency)
        .bind(&alert.to_currency)
        .bind(&alert.name)
        .bind(alert.threshold)
        .bind(alert.is_below)
        .bind(alert.created_on)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_alert(&self, user_id: Uuid, from: &str, to: &str) -> CoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM alerts WHERE user_id = $1 AND from_currency = $2 AND to_currency = $3",
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}
