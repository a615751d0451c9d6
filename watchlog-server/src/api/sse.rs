//! Server-Sent Events for collection changes
//!
//! Each connected client gets the full collection on connect and again after
//! every committed change, so it can re-render without polling.

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use watchlog_common::events::WatchlogEvent;
use watchlog_common::ShowSeason;

fn snapshot_event(event_type: &str, mut payload: Value, seasons: Vec<ShowSeason>) -> Option<Event> {
    if let Value::Object(map) = &mut payload {
        map.insert("seasons".to_string(), json!(seasons));
    }
    match serde_json::to_string(&payload) {
        Ok(data) => Some(Event::default().event(event_type).data(data)),
        Err(e) => {
            warn!("SSE: Failed to serialize {}: {}", event_type, e);
            None
        }
    }
}

/// GET /api/events
///
/// Streams:
/// - CollectionSnapshot (on connect, and after a lagged receiver resyncs)
/// - CollectionChanged (event fields plus the full collection)
/// - PersistenceFailed
pub async fn event_stream(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to collection events");

    let mut rx = state.library.events().subscribe();
    let library = state.library.clone();

    let stream = async_stream::stream! {
        let total = library.len().await;
        if let Some(event) = snapshot_event("CollectionSnapshot", json!({ "total": total }), library.snapshot().await) {
            yield Ok(event);
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(15)) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = rx.recv() => match received {
                    Ok(event @ WatchlogEvent::CollectionChanged { .. }) => {
                        let payload = serde_json::to_value(&event).unwrap_or(Value::Null);
                        if let Some(sse) = snapshot_event(event.event_type(), payload, library.snapshot().await) {
                            yield Ok(sse);
                        }
                    }
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(data) => {
                            yield Ok(Event::default().event(event.event_type()).data(data));
                        }
                        Err(e) => warn!("SSE: Failed to serialize event {}: {}", event.event_type(), e),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "SSE: Client lagged, resending snapshot");
                        let total = library.len().await;
                        if let Some(sse) = snapshot_event("CollectionSnapshot", json!({ "total": total }), library.snapshot().await) {
                            yield Ok(sse);
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
        debug!("SSE: Collection event stream ended");
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("heartbeat"))
}
