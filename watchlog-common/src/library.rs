//! The in-memory collection and every operation on it
//!
//! The library is the single writer. Each mutation is computed on a copy,
//! persisted to the active store, and only then committed to memory, so a
//! failed write leaves the collection exactly as it was. Every commit
//! publishes [`WatchlogEvent::CollectionChanged`].

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::bootstrap::Bootstrap;
use crate::events::{ChangeCause, EventBus, WatchlogEvent};
use crate::merge::{partition_incoming, MergePlan};
use crate::models::{now_millis, SeasonDraft, ShowSeason};
use crate::share;
use crate::stats::{compute_stats, CollectionStats};
use crate::storage::subscription::Snapshot;
use crate::storage::{Mutation, SeasonStore};
use crate::uuid_utils;
use crate::view::{apply_view, available_years, ViewQuery};
use crate::{Error, Result};

/// Result of an import request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    /// `false` for a preview: nothing was written
    pub committed: bool,
    pub added: usize,
    pub skipped: usize,
    /// Ids prepended (or that would be), in incoming order
    pub added_ids: Vec<String>,
    pub skipped_ids: Vec<String>,
    /// Collection size after the import (or unchanged size for a preview)
    pub total: usize,
}

/// Download name for an export taken on `day`
pub fn export_filename(day: NaiveDate) -> String {
    format!("tv-tracker-backup-{}.json", day.format("%Y-%m-%d"))
}

pub struct Library {
    seasons: RwLock<Vec<ShowSeason>>,
    /// Time of the latest committed local write; only touched under the `seasons` write lock
    last_write: Mutex<Option<Instant>>,
    store: Arc<dyn SeasonStore>,
    events: EventBus,
    share_base_url: String,
}

impl Library {
    pub fn new(store: Arc<dyn SeasonStore>, events: EventBus, share_base_url: impl Into<String>) -> Self {
        Self {
            seasons: RwLock::new(Vec::new()),
            last_write: Mutex::new(None),
            store,
            events,
            share_base_url: share_base_url.into(),
        }
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Install the startup collection
    ///
    /// When it came from somewhere other than the active store (static file or
    /// defaults) and the active store is the local one, the store is seeded
    /// with it. Remote stores are never seeded implicitly.
    pub async fn install(&self, bootstrap: Bootstrap) {
        let mut guard = self.seasons.write().await;

        if bootstrap.origin != self.store.name() && !self.store.authoritative() {
            match self.store.replace_all(&bootstrap.seasons).await {
                Ok(()) => info!(
                    store = self.store.name(),
                    origin = %bootstrap.origin,
                    count = bootstrap.seasons.len(),
                    "Seeded store from bootstrap source"
                ),
                Err(e) => warn!(store = self.store.name(), "Failed to seed store: {}", e),
            }
        }

        *guard = bootstrap.seasons;
        self.publish(ChangeCause::Bootstrap, Vec::new(), guard.len());
    }

    /// Copy of the whole collection in stored order
    pub async fn snapshot(&self) -> Vec<ShowSeason> {
        self.seasons.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.seasons.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.seasons.read().await.is_empty()
    }

    /// Filtered and sorted view
    pub async fn list(&self, view: &ViewQuery) -> Vec<ShowSeason> {
        apply_view(&self.seasons.read().await, view)
    }

    pub async fn years(&self) -> Vec<i32> {
        available_years(&self.seasons.read().await)
    }

    pub async fn get(&self, id: &str) -> Result<ShowSeason> {
        self.seasons
            .read()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Season {} not found", id)))
    }

    /// Validate a draft and add it at the front of the collection
    pub async fn create(&self, draft: SeasonDraft) -> Result<ShowSeason> {
        draft.validate()?;
        let season = draft.into_season(uuid_utils::generate_id(), now_millis());

        let mut guard = self.seasons.write().await;
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.push(season.clone());
        next.extend(guard.iter().cloned());

        self.persist(Mutation::Upsert(&season), &next).await?;
        *guard = next;
        self.mark_written().await;
        info!(id = %season.id, title = %season.title, season = season.season, "Created season");
        self.publish(ChangeCause::Created, vec![season.id.clone()], guard.len());
        Ok(season)
    }

    /// Replace a record's editable fields; id and creation time are kept
    pub async fn update(&self, id: &str, draft: SeasonDraft) -> Result<ShowSeason> {
        draft.validate()?;

        let mut guard = self.seasons.write().await;
        let index = guard
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(format!("Season {} not found", id)))?;
        let updated = draft.into_season(guard[index].id.clone(), guard[index].created_at);

        let mut next = guard.clone();
        next[index] = updated.clone();

        self.persist(Mutation::Upsert(&updated), &next).await?;
        *guard = next;
        self.mark_written().await;
        info!(id = %updated.id, "Updated season");
        self.publish(ChangeCause::Updated, vec![updated.id.clone()], guard.len());
        Ok(updated)
    }

    /// Remove a record; refused unless the caller confirmed
    pub async fn delete(&self, id: &str, confirmed: bool) -> Result<ShowSeason> {
        let mut guard = self.seasons.write().await;
        let index = guard
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(format!("Season {} not found", id)))?;
        if !confirmed {
            return Err(Error::ConfirmationRequired(format!(
                "Deleting '{}' season {} requires confirmation",
                guard[index].title, guard[index].season
            )));
        }

        let mut next = guard.clone();
        let removed = next.remove(index);

        self.persist(Mutation::Remove(&removed.id), &next).await?;
        *guard = next;
        self.mark_written().await;
        info!(id = %removed.id, title = %removed.title, "Deleted season");
        self.publish(ChangeCause::Deleted, vec![removed.id.clone()], guard.len());
        Ok(removed)
    }

    /// What importing `incoming` would add and skip
    pub async fn preview_import(&self, incoming: Vec<ShowSeason>) -> MergePlan {
        partition_incoming(&self.seasons.read().await, incoming).plan
    }

    /// Merge `incoming` into the collection
    ///
    /// Without confirmation this is a preview and nothing changes.
    pub async fn import(&self, incoming: Vec<ShowSeason>, confirmed: bool) -> Result<ImportOutcome> {
        let mut guard = self.seasons.write().await;
        let outcome = partition_incoming(&guard, incoming);
        let plan = outcome.plan;

        if !confirmed || outcome.novel.is_empty() {
            debug!(
                added = plan.added_count(),
                skipped = plan.skipped_count(),
                confirmed,
                "Import produced no changes"
            );
            return Ok(ImportOutcome {
                committed: confirmed,
                added: plan.added_count(),
                skipped: plan.skipped_count(),
                added_ids: plan.added,
                skipped_ids: plan.skipped,
                total: guard.len(),
            });
        }

        let mut next = outcome.novel;
        let novel_count = next.len();
        next.extend(guard.iter().cloned());

        self.persist(Mutation::Insert(&next[..novel_count]), &next).await?;
        *guard = next;
        self.mark_written().await;
        info!(added = plan.added_count(), skipped = plan.skipped_count(), "Imported seasons");
        self.publish(ChangeCause::Imported, plan.added.clone(), guard.len());

        Ok(ImportOutcome {
            committed: true,
            added: plan.added_count(),
            skipped: plan.skipped_count(),
            added_ids: plan.added,
            skipped_ids: plan.skipped,
            total: guard.len(),
        })
    }

    /// Whole collection as pretty-printed JSON
    pub async fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&*self.seasons.read().await)?)
    }

    /// Link carrying the whole collection
    pub async fn share_url(&self) -> Result<String> {
        share::share_url(&self.share_base_url, &self.seasons.read().await)
    }

    pub async fn stats(&self) -> CollectionStats {
        compute_stats(&self.seasons.read().await)
    }

    /// Replace the whole collection with a live snapshot from the store
    ///
    /// A snapshot whose read began before the latest local write may predate
    /// it and is dropped; the next poll carries the write.
    pub async fn apply_snapshot(&self, snapshot: Snapshot) {
        let mut guard = self.seasons.write().await;
        if let Some(written) = *self.last_write.lock().await {
            if snapshot.requested_at < written {
                debug!("Dropped remote snapshot read before the latest local write");
                return;
            }
        }
        if *guard == snapshot.seasons {
            return;
        }
        *guard = snapshot.seasons;
        debug!(count = guard.len(), "Applied remote snapshot");
        self.publish(ChangeCause::RemoteSnapshot, Vec::new(), guard.len());
    }

    /// Feed snapshots from a poller into the library until the channel closes
    pub fn follow_snapshots(self: Arc<Self>, mut rx: mpsc::Receiver<Snapshot>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                self.apply_snapshot(snapshot).await;
            }
            debug!("Snapshot channel closed");
        })
    }

    async fn persist(&self, mutation: Mutation<'_>, next: &[ShowSeason]) -> Result<()> {
        if let Err(e) = self.store.apply(mutation, next).await {
            error!(store = self.store.name(), "Write failed, collection unchanged: {}", e);
            self.events.emit_lossy(WatchlogEvent::PersistenceFailed {
                store: self.store.name().to_string(),
                message: e.to_string(),
                timestamp: chrono::Utc::now(),
            });
            return Err(e);
        }
        Ok(())
    }

    async fn mark_written(&self) {
        *self.last_write.lock().await = Some(Instant::now());
    }

    fn publish(&self, cause: ChangeCause, ids: Vec<String>, total: usize) {
        self.events.emit_lossy(WatchlogEvent::changed(cause, ids, total));
    }
}
