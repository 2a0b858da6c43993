use async_trait::async_trait;
use domain::{CoreResult, PortfolioEntry};
use portfolio_engine::PortfolioRepository;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::db_err;

#[derive(Clone)]
pub struct PostgresPortfolioRepository {
    pool: PgPool,
}

impl PostgresPortfolioRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn entry_from_row(row: &PgRow) -> Result<PortfolioEntry, sqlx::Error> {
    Ok(PortfolioEntry {
        user_id: row.try_get("user_id")?,
        currency_symbol: row.try_get("currency_symbol")?,
        quantity: row.try_get::<f64, _>("quantity")?,
    })
}

#[async_trait]
impl PortfolioRepository for PostgresPortfolioRepository {
    async fn find_entry(&self, user_id: Uuid, symbol: &str) -> CoreResult<Option<PortfolioEntry>> {
        let row = sqlx::query(
            "SELECT user_id, currency_symbol, quantity FROM portfolio_entries
             WHERE user_id = $1 AND currency_symbol = $2",
        )
        .bind(user_id)
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(entry_from_row).transpose().map_err(db_err)
    }

    async fn list_entries(&self, user_id: Uuid) -> CoreResult<Vec<PortfolioEntry>> {
        let rows = sqlx::query(
            "SELECT user_id, currency_symbol, quantity FROM portfolio_entries
             WHERE user_id = $1
             ORDER BY inserted_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter()
            .map(entry_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)
    }

    async fn create_entry(&self, entry: &PortfolioEntry) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO portfolio_entries (user_id, currency_symbol, quantity)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, currency_symbol) DO UPDATE SET quantity = EXCLUDED.quantity",
        )
        .bind(entry.user_id)
        .bind(&entry.currency_symbol)
        .bind(entry.quantity)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn update_entry(&self, entry: &PortfolioEntry) -> CoreResult<bool> {
        let result = sqlx::query(
            "UPDATE portfolio_entries SET quantity = $3
             WHERE user_id = $1 AND currency_symbol = $2",
        )
        .bind(entry.user_id)
        .bind(&entry.currency_symbol)
        .bind(entry.quantity)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_entry(&self, user_id: Uuid, symbol: &str) -> CoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM portfolio_entries WHERE user_id = $1 AND currency_symbol = $2",
        )
        .bind(user_id)
        .bind(symbol)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}
