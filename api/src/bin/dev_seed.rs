use std::env;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("../migrations").run(&pool).await?;

    let email = env::var("DEV_SEED_EMAIL").unwrap_or_else(|_| "demo@example.com".to_string());
    let password = env::var("DEV_SEED_PASSWORD").unwrap_or_else(|_| "password123".to_string());

    let token = seed_demo(&pool, &email, &password).await?;
    println!("Seeded demo user {email} (dev only).");
    println!("Bearer token: {token}");
    Ok(())
}

async fn seed_demo(pool: &PgPool, email: &str, password: &str) -> Result<String> {
    let user_id = Uuid::new_v5(&Uuid::NAMESPACE_OID, email.as_bytes());
    let password_hash =
        bcrypt::hash(password, bcrypt::DEFAULT_COST).context("failed to hash demo password")?;

    let mut tx = pool.begin().await?;

    // Start from a clean slate for this user so reruns are stable.
    sqlx::query("DELETE FROM users WHERE id = $1 OR lower(email) = lower($2)")
        .bind(user_id)
        .bind(email)
        .execute(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(email)
        .bind(&password_hash)
        .execute(&mut *tx)
        .await?;

    let today = Utc::now().date_naive();
    for (name, from, to, threshold, is_below) in [
        ("USD dips", "USD", "CAD", 1.30_f64, true),
        ("EUR climbs", "EUR", "CAD", 1.50_f64, false),
    ] {
        sqlx::query(
            "INSERT INTO alerts (user_id, name, from_currency, to_currency, threshold, is_below, created_on)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user_id)
        .bind(name)
        .bind(from)
        .bind(to)
        .bind(threshold)
        .bind(is_below)
        .bind(today)
        .execute(&mut *tx)
        .await?;
    }

    for (symbol, quantity) in [("USD", 100.0_f64), ("EUR", 50.0_f64)] {
        sqlx::query(
            "INSERT INTO portfolio_entries (user_id, currency_symbol, quantity) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(symbol)
        .bind(quantity)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(auth::derive_token(email, &password_hash))
}
