//! Postgres persistence for the newsloom pipeline.

pub mod error;
pub mod models;

mod archive;
mod articles;
mod cycles;
mod duplicates;
mod feeds;
mod items;
mod ratings;
mod settings;

use sqlx::PgPool;

pub use error::{Result, StoreError};
pub use models::*;
pub use sqlx::types::Json;

/// Handle to the durable store. All writes are scoped to a single cycle
/// id; the query surface is split across per-table modules.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}
