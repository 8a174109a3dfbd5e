//! Postgres binding for the recycle-bin service.
//!
//! Provides the connection-pool helpers used at startup and
//! [`PgRowStore`], the Postgres implementation of the core's `RowStore`
//! boundary.

pub mod store;

pub use store::PgRowStore;

/// Shared connection pool type.
pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Cheap reachability probe (`SELECT 1`).
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
