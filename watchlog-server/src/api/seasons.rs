//! Season CRUD and the filtered table view

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use watchlog_common::view::{SortKey, ViewQuery};
use watchlog_common::{SeasonDraft, ShowSeason};

use super::ConfirmParams;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;

/// Raw query string of GET /api/seasons
///
/// Kept as strings so an empty `year=` means "all years" instead of a
/// deserialization failure.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub year: Option<String>,
    pub sort: Option<String>,
}

impl ListParams {
    fn into_view(self) -> ApiResult<ViewQuery> {
        let year = match self.year.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(
                raw.parse::<i32>()
                    .map_err(|_| ApiError::BadRequest(format!("Invalid year: {}", raw)))?,
            ),
        };
        let sort = self.sort.as_deref().unwrap_or_default().parse::<SortKey>()?;
        Ok(ViewQuery::new(self.q.unwrap_or_default(), year, sort))
    }
}

/// GET /api/seasons?q=&year=&sort=
pub async fn list_seasons(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<Vec<ShowSeason>>> {
    let view = params.into_view()?;
    Ok(Json(state.library.list(&view).await))
}

/// GET /api/seasons/:id
pub async fn get_season(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ShowSeason>> {
    Ok(Json(state.library.get(&id).await?))
}

/// POST /api/seasons
pub async fn create_season(
    State(state): State<AppState>,
    ApiJson(draft): ApiJson<SeasonDraft>,
) -> ApiResult<(StatusCode, Json<ShowSeason>)> {
    let season = state.library.create(draft).await?;
    Ok((StatusCode::CREATED, Json(season)))
}

/// PUT /api/seasons/:id
pub async fn update_season(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(draft): ApiJson<SeasonDraft>,
) -> ApiResult<Json<ShowSeason>> {
    Ok(Json(state.library.update(&id, draft).await?))
}

/// DELETE /api/seasons/:id?confirm=true
pub async fn delete_season(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<ConfirmParams>,
) -> ApiResult<Json<ShowSeason>> {
    Ok(Json(state.library.delete(&id, params.confirm).await?))
}

/// GET /api/years
pub async fn list_years(State(state): State<AppState>) -> Json<Vec<i32>> {
    Json(state.library.years().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_parsing() {
        let view = ListParams {
            q: Some("drama".into()),
            year: Some("2023".into()),
            sort: Some("rating-desc".into()),
        }
        .into_view()
        .unwrap();
        assert_eq!(view, ViewQuery::new("drama", Some(2023), SortKey::RatingDesc));

        let view = ListParams {
            year: Some(String::new()),
            ..Default::default()
        }
        .into_view()
        .unwrap();
        assert_eq!(view, ViewQuery::default());

        assert!(ListParams {
            sort: Some("random".into()),
            ..Default::default()
        }
        .into_view()
        .is_err());
    }
}
