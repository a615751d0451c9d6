//! Live snapshots from a remote store
//!
//! A background task re-reads the whole collection at a fixed interval and
//! forwards it when it differs from the last one seen. Consumers always
//! replace their entire in-memory collection with the snapshot, unless it
//! was requested before their own latest write.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::SeasonStore;
use crate::models::ShowSeason;

/// Full-collection snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub seasons: Vec<ShowSeason>,
    /// When the read that produced it was started
    pub requested_at: Instant,
}

/// Start polling `store`; the task ends when the receiver is dropped
pub fn spawn_snapshot_poller(
    store: Arc<dyn SeasonStore>,
    interval: Duration,
) -> (mpsc::Receiver<Snapshot>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(4);

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last: Option<Vec<ShowSeason>> = None;

        loop {
            ticker.tick().await;
            if tx.is_closed() {
                break;
            }

            let requested_at = Instant::now();
            match store.load_all().await {
                Ok(current) => {
                    let current = current.unwrap_or_default();
                    if last.as_ref() == Some(&current) {
                        continue;
                    }
                    debug!(store = store.name(), count = current.len(), "Remote collection changed");
                    last = Some(current.clone());
                    let snapshot = Snapshot {
                        seasons: current,
                        requested_at,
                    };
                    if tx.send(snapshot).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(store = store.name(), "Snapshot poll failed: {}", e);
                }
            }
        }

        debug!(store = store.name(), "Snapshot poller stopped");
    });

    (rx, handle)
}
