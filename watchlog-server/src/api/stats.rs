//! Collection statistics

use axum::{extract::State, Json};
use watchlog_common::stats::CollectionStats;

use crate::AppState;

/// GET /api/stats
pub async fn get_stats(State(state): State<AppState>) -> Json<CollectionStats> {
    Json(state.library.stats().await)
}
