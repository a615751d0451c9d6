//! Local durable store
//!
//! The whole collection is one JSON array under a fixed key in the local
//! SQLite `kv_store` table. Read at startup, rewritten after every mutation.
//! The stored value is never schema-checked beyond deserialization.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use super::{Mutation, SeasonStore};
use crate::db::kv;
use crate::models::ShowSeason;
use crate::{Error, Result};

/// Key holding the serialized collection
pub const STORAGE_KEY: &str = "tv-tracker-data";

/// SQLite-backed key-value store
#[derive(Clone)]
pub struct LocalStore {
    pool: SqlitePool,
    key: String,
}

impl LocalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            key: STORAGE_KEY.to_string(),
        }
    }

    async fn write(&self, seasons: &[ShowSeason]) -> Result<()> {
        let json = serde_json::to_string(seasons)?;
        kv::set(&self.pool, &self.key, &json).await?;
        debug!(key = %self.key, count = seasons.len(), "Wrote collection to local store");
        Ok(())
    }
}

#[async_trait]
impl SeasonStore for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn load_all(&self) -> Result<Option<Vec<ShowSeason>>> {
        let Some(raw) = kv::get(&self.pool, &self.key).await? else {
            return Ok(None);
        };
        let seasons: Vec<ShowSeason> = serde_json::from_str(&raw).map_err(|e| {
            Error::InvalidInput(format!("Stored collection under '{}' is unreadable: {}", self.key, e))
        })?;
        Ok(Some(seasons))
    }

    async fn apply(&self, _mutation: Mutation<'_>, next: &[ShowSeason]) -> Result<()> {
        self.write(next).await
    }

    async fn replace_all(&self, seasons: &[ShowSeason]) -> Result<()> {
        self.write(seasons).await
    }
}
