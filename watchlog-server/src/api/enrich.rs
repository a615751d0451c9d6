//! Metadata lookup for the add/edit form

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use watchlog_common::enrichment::Enrichment;
use watchlog_common::SeasonDraft;

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EnrichRequest {
    pub title: String,
    #[serde(default = "first_season")]
    pub season: u32,
    /// Current form contents; when present the merged draft is returned too
    #[serde(default)]
    pub draft: Option<SeasonDraft>,
}

fn first_season() -> u32 {
    1
}

#[derive(Debug, Serialize)]
pub struct EnrichResponse {
    pub provider: &'static str,
    pub enrichment: Enrichment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<SeasonDraft>,
}

/// POST /api/enrich
///
/// Never modifies the collection.
pub async fn enrich_season(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<EnrichRequest>,
) -> ApiResult<Json<EnrichResponse>> {
    let enricher = state
        .enricher
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Metadata enrichment is not configured".to_string()))?;

    let title = request.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }
    if request.season == 0 {
        return Err(ApiError::BadRequest("Season number must be at least 1".to_string()));
    }

    info!(provider = enricher.name(), title = %title, season = request.season, "Enriching season");
    let enrichment = enricher.enrich(title, request.season).await?;

    let draft = request.draft.map(|mut draft| {
        enrichment.apply_to(&mut draft);
        draft
    });

    Ok(Json(EnrichResponse {
        provider: enricher.name(),
        enrichment,
        draft,
    }))
}
