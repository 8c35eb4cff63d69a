use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::config::Config;
use crate::error::StoreError;

pub type DbPool = SqlitePool;

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(config: &Config) -> Result<DbPool, StoreError> {
  tracing::info!(url = %config.database_url, "Initializing database");

  let pool = SqlitePoolOptions::new()
    .max_connections(config.max_connections)
    .connect(&config.database_url)
    .await?;

  run_migrations(&pool).await?;

  tracing::info!("Database initialized successfully");

  Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), StoreError> {
  sqlx::migrate!("./migrations").run(pool).await?;
  Ok(())
}
