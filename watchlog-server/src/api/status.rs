//! Service status: active backend, bootstrap origin, feature availability
//!
//! Clients show a degraded-mode banner when enrichment is disabled or the
//! collection came from the built-in defaults.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub backend: String,
    pub bootstrap_origin: String,
    pub live_sync: bool,
    /// "enabled" or "disabled"
    pub enrichment: &'static str,
    pub enrichment_provider: Option<&'static str>,
    pub seasons: usize,
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub build_profile: &'static str,
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let provider = state.enricher.as_ref().map(|e| e.name());
    Json(StatusResponse {
        backend: state.info.backend.clone(),
        bootstrap_origin: state.info.bootstrap_origin.clone(),
        live_sync: state.info.live_sync,
        enrichment: if provider.is_some() { "enabled" } else { "disabled" },
        enrichment_provider: provider,
        seasons: state.library.len().await,
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
        build_profile: env!("BUILD_PROFILE"),
    })
}
