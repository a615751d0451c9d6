//! Event definitions and EventBus
//!
//! Every change to the in-memory collection is published here so that
//! connected clients (SSE) can re-render their derived views.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Why the collection changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCause {
    Bootstrap,
    Created,
    Updated,
    Deleted,
    Imported,
    /// Replaced wholesale by a live snapshot from the remote store
    RemoteSnapshot,
}

/// Watch log events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WatchlogEvent {
    /// The collection was modified
    CollectionChanged {
        cause: ChangeCause,
        /// Season ids touched by the change; empty for whole-collection replacements
        ids: Vec<String>,
        /// Collection size after the change
        total: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A write to the active store failed and the collection was left unchanged
    PersistenceFailed {
        store: String,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl WatchlogEvent {
    pub fn changed(cause: ChangeCause, ids: Vec<String>, total: usize) -> Self {
        WatchlogEvent::CollectionChanged {
            cause,
            ids,
            total,
            timestamp: chrono::Utc::now(),
        }
    }

    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            WatchlogEvent::CollectionChanged { .. } => "CollectionChanged",
            WatchlogEvent::PersistenceFailed { .. } => "PersistenceFailed",
        }
    }
}

/// Central event distribution bus
///
/// Backed by `tokio::sync::broadcast`: publishing never blocks, slow
/// subscribers observe `Lagged` instead of stalling producers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WatchlogEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<WatchlogEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: WatchlogEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = WatchlogEvent::changed(ChangeCause::Imported, vec!["a".into()], 3);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "CollectionChanged");
        assert_eq!(json["cause"], "imported");
        assert_eq!(json["total"], 3);
        assert_eq!(event.event_type(), "CollectionChanged");
    }

    #[tokio::test]
    async fn test_emit_reaches_subscribers() {
        let bus = EventBus::new(10);
        // Nobody listening yet: dropped without error
        bus.emit_lossy(WatchlogEvent::changed(ChangeCause::Deleted, vec![], 0));

        let mut rx = bus.subscribe();
        bus.emit_lossy(WatchlogEvent::changed(ChangeCause::Created, vec!["x".into()], 1));

        match rx.recv().await.unwrap() {
            WatchlogEvent::CollectionChanged { cause, ids, total, .. } => {
                assert_eq!(cause, ChangeCause::Created);
                assert_eq!(ids, vec!["x".to_string()]);
                assert_eq!(total, 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
