//! PostgreSQL persistence for the warble engine.

use sqlx::{
    PgPool,
    migrate::{MigrateError, Migrator},
    postgres::PgPoolOptions,
};
use thiserror::Error;
use tracing::info;

pub mod client;
mod record;
mod store;

pub static MIGRATOR: Migrator = sqlx::migrate!();

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Could not connect to the database: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("Could not migrate the database: {0}")]
    Migrate(#[from] MigrateError),
}

pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, SetupError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(SetupError::Connect)
}

pub async fn migrate(pool: &PgPool) -> Result<(), SetupError> {
    MIGRATOR.run(pool).await?;
    info!("Database migrations applied");

    Ok(())
}
