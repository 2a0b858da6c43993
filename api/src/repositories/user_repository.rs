use async_trait::async_trait;
use auth::UserDirectory;
use domain::{CoreResult, User};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::db_err;

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
    })
}

#[async_trait]
impl UserDirectory for PostgresUserRepository {
    async fn find_user_by_id(&self, user_id: Uuid) -> CoreResult<Option<User>> {
        let row = sqlx::query("SELECT id, email, password_hash FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(user_from_row).transpose().map_err(db_err)
    }

    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash FROM users
             WHERE lower(email) = lower($1)
             ORDER BY created_at ASC, id ASC
             LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(user_from_row).transpose().map_err(db_err)
    }

    /// Stable listing order; token verification returns the first match.
    async fn list_users(&self) -> CoreResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT id, email, password_hash FROM users ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)
    }
}
