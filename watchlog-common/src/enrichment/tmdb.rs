//! TMDB lookup
//!
//! `/search/tv` picks the series, `/tv/{id}` supplies networks, genres and
//! the series status, `/tv/{id}/season/{n}` supplies the season overview and
//! per-episode air dates.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use super::{Enrichment, MetadataEnricher};
use crate::models::ExternalUrls;
use crate::storage::{ensure_success, http_client};
use crate::{Error, Result};

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const TMDB_WEB_URL: &str = "https://www.themoviedb.org";

pub struct TmdbEnricher {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    language: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: i64,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct Named {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct TvDetails {
    #[serde(default)]
    networks: Vec<Named>,
    #[serde(default)]
    genres: Vec<Named>,
    #[serde(default)]
    episode_run_time: Vec<u32>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    vote_average: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct SeasonDetails {
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    air_date: Option<String>,
    #[serde(default)]
    episodes: Vec<EpisodeSummary>,
}

#[derive(Debug, Default, Deserialize)]
struct EpisodeSummary {
    #[serde(default)]
    air_date: Option<String>,
    #[serde(default)]
    runtime: Option<u32>,
}

impl TmdbEnricher {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key: api_key.into(),
            base_url: TMDB_BASE_URL.to_string(),
            language: "en-US".to_string(),
        })
    }

    /// Point at a different API root (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str, extra: &[(&str, &str)]) -> Result<T> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(&[("api_key", self.api_key.as_str()), ("language", self.language.as_str())])
            .query(extra)
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }
}

#[async_trait]
impl MetadataEnricher for TmdbEnricher {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    async fn enrich(&self, title: &str, season: u32) -> Result<Enrichment> {
        let search: SearchResponse = self.get("/search/tv", &[("query", title)]).await?;
        let series = search
            .results
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("No TMDB match for '{}'", title)))?;
        debug!(series_id = series.id, name = %series.name, "TMDB series match");

        let details: TvDetails = self.get(&format!("/tv/{}", series.id), &[]).await?;
        let season_details: SeasonDetails = self
            .get(&format!("/tv/{}/season/{}", series.id, season), &[])
            .await?;

        Ok(build_enrichment(
            series.id,
            season,
            &details,
            &season_details,
            chrono::Utc::now().date_naive(),
        ))
    }
}

fn parse_day(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
}

fn build_enrichment(
    series_id: i64,
    season: u32,
    details: &TvDetails,
    season_details: &SeasonDetails,
    today: NaiveDate,
) -> Enrichment {
    let episode_dates: Vec<Option<NaiveDate>> = season_details
        .episodes
        .iter()
        .map(|e| parse_day(e.air_date.as_deref()))
        .collect();
    let start_date = parse_day(season_details.air_date.as_deref())
        .or_else(|| episode_dates.iter().flatten().min().copied());
    let last_aired = episode_dates.last().copied().flatten().filter(|d| *d <= today);

    let returning = details.status.as_deref() == Some("Returning Series");
    let ongoing = returning && last_aired.is_none();

    let runtimes: Vec<u32> = season_details.episodes.iter().filter_map(|e| e.runtime).collect();
    let runtime = details.episode_run_time.first().copied().or_else(|| {
        (!runtimes.is_empty()).then(|| {
            let total: u32 = runtimes.iter().sum();
            (total as f64 / runtimes.len() as f64).round() as u32
        })
    });

    let mut enrichment = Enrichment {
        network: details
            .networks
            .iter()
            .map(|n| n.name.trim())
            .find(|n| !n.is_empty())
            .map(str::to_string),
        genres: details.genres.iter().map(|g| g.name.clone()).collect(),
        synopsis: season_details
            .overview
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        episodes: u32::try_from(season_details.episodes.len()).ok().filter(|n| *n > 0),
        runtime: runtime.filter(|r| *r > 0),
        start_date,
        end_date: if ongoing { None } else { last_aired },
        ongoing: Some(ongoing),
        urls: ExternalUrls {
            tmdb: Some(format!("{}/tv/{}/season/{}", TMDB_WEB_URL, series_id, season)),
            ..Default::default()
        },
        ..Default::default()
    };
    enrichment.ratings.tmdb = details.vote_average.filter(|v| *v > 0.0);
    enrichment
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn details() -> TvDetails {
        serde_json::from_value(json!({
            "id": 136315,
            "name": "The Bear",
            "networks": [{ "id": 88, "name": "FX" }],
            "genres": [{ "id": 18, "name": "Drama" }, { "id": 35, "name": "Comedy" }],
            "episode_run_time": [],
            "status": "Returning Series",
            "vote_average": 8.2
        }))
        .unwrap()
    }

    fn season_details(last_air_date: Option<&str>) -> SeasonDetails {
        serde_json::from_value(json!({
            "air_date": "2023-06-22",
            "overview": "  Carmy pushes the team toward a new restaurant. ",
            "episodes": [
                { "air_date": "2023-06-22", "runtime": 30 },
                { "air_date": "2023-06-22", "runtime": 36 },
                { "air_date": last_air_date, "runtime": null }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_finished_season() {
        let enrichment = build_enrichment(136315, 2, &details(), &season_details(Some("2023-06-22")), day("2024-01-01"));
        assert_eq!(enrichment.network.as_deref(), Some("FX"));
        assert_eq!(enrichment.genres, vec!["Drama".to_string(), "Comedy".to_string()]);
        assert_eq!(enrichment.synopsis.as_deref(), Some("Carmy pushes the team toward a new restaurant."));
        assert_eq!(enrichment.episodes, Some(3));
        assert_eq!(enrichment.runtime, Some(33));
        assert_eq!(enrichment.start_date, Some(day("2023-06-22")));
        assert_eq!(enrichment.end_date, Some(day("2023-06-22")));
        assert_eq!(enrichment.ongoing, Some(false));
        assert_eq!(enrichment.ratings.tmdb, Some(8.2));
        assert_eq!(
            enrichment.urls.tmdb.as_deref(),
            Some("https://www.themoviedb.org/tv/136315/season/2")
        );
    }

    #[test]
    fn test_airing_season_is_ongoing() {
        let enrichment = build_enrichment(1, 3, &details(), &season_details(Some("2030-01-01")), day("2024-01-01"));
        assert_eq!(enrichment.ongoing, Some(true));
        assert!(enrichment.end_date.is_none());

        let enrichment = build_enrichment(1, 3, &details(), &season_details(None), day("2024-01-01"));
        assert_eq!(enrichment.ongoing, Some(true));
    }

    #[test]
    fn test_search_response_tolerates_missing_results() {
        let search: SearchResponse = serde_json::from_value(json!({ "page": 1 })).unwrap();
        assert!(search.results.is_empty());
    }
}
