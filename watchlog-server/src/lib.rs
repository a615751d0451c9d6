//! watchlog-server library - HTTP front end for the watch log

use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use watchlog_common::enrichment::MetadataEnricher;
use watchlog_common::Library;

pub mod api;
pub mod error;
pub mod extract;

/// Startup facts reported by `/api/status`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    /// Active store name
    pub backend: String,
    /// Where the startup collection came from
    pub bootstrap_origin: String,
    /// Remote snapshots are being polled
    pub live_sync: bool,
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub library: Arc<Library>,
    /// `None` when no enrichment credentials are configured
    pub enricher: Option<Arc<dyn MetadataEnricher>>,
    pub info: Arc<ServiceInfo>,
}

impl AppState {
    pub fn new(library: Arc<Library>, enricher: Option<Arc<dyn MetadataEnricher>>, info: ServiceInfo) -> Self {
        Self {
            library,
            enricher,
            info: Arc::new(info),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let api = Router::new()
        .route("/api/status", get(api::get_status))
        .route("/api/seasons", get(api::list_seasons).post(api::create_season))
        .route(
            "/api/seasons/:id",
            get(api::get_season)
                .put(api::update_season)
                .delete(api::delete_season),
        )
        .route("/api/years", get(api::list_years))
        .route("/api/stats", get(api::get_stats))
        .route("/api/export", get(api::export_collection))
        .route("/api/import", post(api::import_collection))
        .route("/api/share", get(api::get_share_url))
        .route("/api/share/import", post(api::import_share))
        .route("/api/enrich", post(api::enrich_season))
        .route("/api/events", get(api::event_stream));

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
