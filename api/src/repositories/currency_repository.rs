use async_trait::async_trait;
use domain::{normalize_symbol, CoreResult, Currency};
use rates::CurrencyRepository;
use sqlx::{postgres::PgRow, PgPool, Row};

use super::db_err;

#[derive(Clone)]
pub struct PostgresCurrencyRepository {
    pool: PgPool,
}

impl PostgresCurrencyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn currency_from_row(row: &PgRow) -> Result<Currency, sqlx::Error> {
    Ok(Currency {
        symbol: row.try_get("symbol")?,
        name: row.try_get("name")?,
    })
}

#[async_trait]
impl CurrencyRepository for PostgresCurrencyRepository {
    async fn find_currency(&self, symbol: &str) -> CoreResult<Option<Currency>> {
        let row = sqlx::query("SELECT symbol, name FROM currencies WHERE symbol = $1")
            .bind(normalize_symbol(symbol))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(currency_from_row).transpose().map_err(db_err)
    }

    async fn list_currencies(&self) -> CoreResult<Vec<Currency>> {
        let rows = sqlx::query("SELECT symbol, name FROM currencies ORDER BY symbol")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter()
            .map(currency_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)
    }
}
