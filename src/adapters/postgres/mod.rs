//! PostgreSQL adapters - Database implementations for the billing ports.
//!
//! - `PostgresBillingStore` - read repositories and `TransactionManager`
//! - `PostgresBillingTransaction` - row-locking scoped transaction
//! - `connect` / `run_migrations` - pool setup for the binary

mod billing_store;
mod rows;
mod transaction;

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

pub use billing_store::PostgresBillingStore;
pub use transaction::PostgresBillingTransaction;

/// Opens a connection pool.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    tracing::info!(max_connections, "Connecting to PostgreSQL");
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
}

/// Applies the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}
