//! PostgreSQL persistence.
//!
//! This crate provides:
//! - Pool construction and embedded migrations
//! - `VideoStore`: video rows with field-scoped stage updates
//! - `WatchHistoryStore`: upsert-only writes with the uniqueness invariant
//! - Snapshot queries for the analytics exporter

pub mod error;
pub mod users;
pub mod videos;
pub mod watch_history;

pub use error::{DbError, DbResult};
pub use users::{UserRow, UserStore};
pub use videos::{DeletedVideoKeys, VideoStore};
pub use watch_history::WatchHistoryStore;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect to Postgres and run pending migrations.
pub async fn connect(database_url: &str) -> DbResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Connect using `DATABASE_URL`.
pub async fn connect_from_env() -> DbResult<PgPool> {
    let url = std::env::var("DATABASE_URL")
        .map_err(|_| DbError::Config("DATABASE_URL not set".to_string()))?;
    connect(&url).await
}
