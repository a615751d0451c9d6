//! Persistence adapters
//!
//! Exactly one [`SeasonStore`] is active per deployment. Stores double as
//! bootstrap sources; the static file is a read-only [`SeasonSource`] only.
//!
//! - [`local::LocalStore`]: SQLite key-value table, whole collection under one key
//! - [`static_file::StaticFileSource`]: JSON array on disk or behind a URL
//! - [`firestore::FirestoreStore`]: one remote document per season
//! - [`github::GithubFileStore`]: one JSON file in a repository, overwritten per commit

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::ShowSeason;
use crate::Result;

pub mod firestore;
pub mod github;
pub mod local;
pub mod static_file;
pub mod subscription;

pub use firestore::{FirestoreConfig, FirestoreStore};
pub use github::{GithubFileConfig, GithubFileStore};
pub use local::LocalStore;
pub use static_file::StaticFileSource;
pub use subscription::spawn_snapshot_poller;

/// Timeout applied to every outbound HTTP request
pub const HTTP_TIMEOUT_SECS: u64 = 30;
/// User agent sent to remote services
pub const USER_AGENT: &str = concat!("watchlog/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by remote adapters
pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()?)
}

/// A read-only origin of season records, tried in priority order at startup
#[async_trait]
pub trait SeasonSource: Send + Sync {
    /// Source identifier for logs and status reporting
    fn name(&self) -> &'static str;

    /// Fetch the stored collection
    ///
    /// # Returns
    /// * `Ok(Some(seasons))` - data present (possibly empty)
    /// * `Ok(None)` - nothing stored at this source
    /// * `Err(_)` - read or parse failure; callers fall back to the next source
    async fn fetch(&self) -> Result<Option<Vec<ShowSeason>>>;

    /// An authoritative source's empty collection is accepted instead of
    /// falling through to the next source
    fn authoritative(&self) -> bool {
        false
    }
}

/// One committed change to the collection
#[derive(Debug, Clone, Copy)]
pub enum Mutation<'a> {
    /// Insert or replace one record by id
    Upsert(&'a ShowSeason),
    /// Remove one record by id
    Remove(&'a str),
    /// Records prepended by an import
    Insert(&'a [ShowSeason]),
}

/// The active persistence backend
///
/// `apply` receives both the mutation and the full collection after it, so
/// whole-collection stores can rewrite everything while document stores
/// touch only what changed.
#[async_trait]
pub trait SeasonStore: Send + Sync {
    /// Backend identifier for logs and status reporting
    fn name(&self) -> &'static str;

    /// Read the whole collection
    async fn load_all(&self) -> Result<Option<Vec<ShowSeason>>>;

    /// Persist one mutation; `next` is the collection once it is applied
    async fn apply(&self, mutation: Mutation<'_>, next: &[ShowSeason]) -> Result<()>;

    /// Overwrite the whole stored collection
    async fn replace_all(&self, seasons: &[ShowSeason]) -> Result<()>;

    /// Remote stores whose other writers make polling worthwhile
    fn supports_live_updates(&self) -> bool {
        false
    }

    /// Empty stored collections are real data, not absence
    fn authoritative(&self) -> bool {
        false
    }
}

/// Exposes a store as a bootstrap source
pub struct StoreSource(pub Arc<dyn SeasonStore>);

#[async_trait]
impl SeasonSource for StoreSource {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    async fn fetch(&self) -> Result<Option<Vec<ShowSeason>>> {
        self.0.load_all().await
    }

    fn authoritative(&self) -> bool {
        self.0.authoritative()
    }
}

/// Map a non-success HTTP response to [`crate::Error::Remote`]
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(crate::Error::Remote {
        status: status.as_u16(),
        message,
    })
}
