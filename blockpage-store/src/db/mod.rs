pub mod block_type_service;
pub mod page_service;
pub mod page_version_service;
pub mod theme_service;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::config::StoreConfig;

pub async fn connect(config: &StoreConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
}

/// Apply the embedded migrations in order. Every migration is idempotent.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(include_str!("../../migrations/001_create_block_types.sql"))
        .execute(pool)
        .await?;
    sqlx::raw_sql(include_str!("../../migrations/002_create_pages.sql"))
        .execute(pool)
        .await?;
    sqlx::raw_sql(include_str!("../../migrations/003_create_page_versions.sql"))
        .execute(pool)
        .await?;
    sqlx::raw_sql(include_str!("../../migrations/004_create_themes.sql"))
        .execute(pool)
        .await?;
    info!("migrations applied");
    Ok(())
}

/// Creates a test pool and runs migrations. Used by the database-backed tests.
/// Run with `cargo test -- --test-threads=1` to avoid migration deadlocks; needs PostgreSQL at DATABASE_URL.
#[cfg(test)]
pub async fn test_pool() -> PgPool {
    let config = StoreConfig::from_env().expect("Invalid store configuration");
    let pool = connect(&config)
        .await
        .expect("Failed to connect to test database. Is PostgreSQL running?");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}
