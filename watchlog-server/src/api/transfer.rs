//! Export, import and share links

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use watchlog_common::library::{export_filename, ImportOutcome};
use watchlog_common::merge::parse_import;
use watchlog_common::share::decode_share_input;
use watchlog_common::ShowSeason;

use super::ConfirmParams;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;

/// GET /api/export
///
/// Pretty-printed JSON served as a dated download.
pub async fn export_collection(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let json = state.library.export_json().await?;
    let filename = export_filename(chrono::Local::now().date_naive());
    info!(file = %filename, "Exporting collection");

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        json,
    ))
}

/// POST /api/import?confirm=
///
/// Body is the raw JSON array. Without `confirm=true` the response is a
/// preview and the collection is untouched.
pub async fn import_collection(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ConfirmParams>,
    body: String,
) -> ApiResult<Json<ImportOutcome>> {
    let records = parse_import(&body)?;
    Ok(Json(state.library.import(records, params.confirm).await?))
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub url: String,
}

/// GET /api/share
pub async fn get_share_url(State(state): State<AppState>) -> ApiResult<Json<ShareResponse>> {
    Ok(Json(ShareResponse {
        url: state.library.share_url().await?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ShareImportRequest {
    /// Full share link or the bare `data` payload
    pub data: String,
}

/// POST /api/share/import?confirm=
pub async fn import_share(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ConfirmParams>,
    ApiJson(request): ApiJson<ShareImportRequest>,
) -> ApiResult<Json<ImportOutcome>> {
    let records: Vec<ShowSeason> = decode_share_input(&request.data)?
        .into_iter()
        .map(ShowSeason::sanitize)
        .collect();
    Ok(Json(state.library.import(records, params.confirm).await?))
}
