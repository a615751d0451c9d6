//! Metadata enrichment
//!
//! Enrichers look a season up on an external service and return a partial
//! record the user can merge into the add/edit form. They never touch the
//! collection themselves.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::config::{EnrichmentConfig, EnrichmentProvider};
use crate::models::{normalize_genres, AggregateRatings, ExternalUrls, GroundingLink, SeasonDraft};
use crate::Result;

pub mod gemini;
pub mod tmdb;

pub use gemini::GeminiEnricher;
pub use tmdb::TmdbEnricher;

/// Best-effort partial season record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    pub network: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub synopsis: Option<String>,
    pub episodes: Option<u32>,
    pub runtime: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub ongoing: Option<bool>,
    #[serde(default)]
    pub ratings: AggregateRatings,
    #[serde(default)]
    pub urls: ExternalUrls,
    #[serde(default)]
    pub sources: Vec<GroundingLink>,
}

impl Enrichment {
    /// Fill the draft's empty fields; anything the user already entered wins
    pub fn apply_to(&self, draft: &mut SeasonDraft) {
        if draft.network.trim().is_empty() {
            if let Some(network) = &self.network {
                draft.network = network.clone();
            }
        }
        if draft.genres.is_empty() {
            draft.genres = normalize_genres(self.genres.clone());
        }
        if draft.synopsis.trim().is_empty() {
            if let Some(synopsis) = &self.synopsis {
                draft.synopsis = synopsis.clone();
            }
        }
        draft.episodes = draft.episodes.or(self.episodes);
        draft.runtime = draft.runtime.or(self.runtime);
        draft.start_date = draft.start_date.or(self.start_date);
        draft.end_date = draft.end_date.or(self.end_date);
        if let Some(ongoing) = self.ongoing {
            if !draft.ongoing {
                draft.ongoing = ongoing;
            }
        }
        draft.ratings.fill_missing(&self.ratings);
        draft.urls.fill_missing(&self.urls);
        if draft.sources.as_ref().map_or(true, Vec::is_empty) && !self.sources.is_empty() {
            draft.sources = Some(self.sources.clone());
        }
    }
}

/// A metadata lookup service
#[async_trait]
pub trait MetadataEnricher: Send + Sync {
    /// Provider name for logging and status reporting
    fn name(&self) -> &'static str;

    /// Look up one season of a show
    async fn enrich(&self, title: &str, season: u32) -> Result<Enrichment>;
}

/// Build the configured enricher, or `None` when no credentials are set
pub fn build_enricher(config: &EnrichmentConfig) -> Result<Option<Arc<dyn MetadataEnricher>>> {
    let tmdb_key = config.tmdb_api_key.as_deref().map(str::trim).filter(|k| !k.is_empty());
    let gemini_key = config.gemini_api_key.as_deref().map(str::trim).filter(|k| !k.is_empty());

    let provider = match config.provider {
        Some(EnrichmentProvider::Tmdb) if tmdb_key.is_some() => EnrichmentProvider::Tmdb,
        Some(EnrichmentProvider::Gemini) if gemini_key.is_some() => EnrichmentProvider::Gemini,
        Some(_) => {
            info!("Enrichment provider configured without credentials, enrichment disabled");
            return Ok(None);
        }
        None if tmdb_key.is_some() => EnrichmentProvider::Tmdb,
        None if gemini_key.is_some() => EnrichmentProvider::Gemini,
        None => {
            info!("No enrichment credentials, enrichment disabled");
            return Ok(None);
        }
    };

    let enricher: Arc<dyn MetadataEnricher> = match (provider, tmdb_key, gemini_key) {
        (EnrichmentProvider::Tmdb, Some(key), _) => {
            let mut enricher = TmdbEnricher::new(key)?;
            if let Some(base_url) = &config.base_url {
                enricher = enricher.with_base_url(base_url.trim_end_matches('/'));
            }
            Arc::new(enricher)
        }
        (EnrichmentProvider::Gemini, _, Some(key)) => {
            let mut enricher = GeminiEnricher::new(key)?;
            if let Some(model) = &config.gemini_model {
                enricher = enricher.with_model(model);
            }
            if let Some(base_url) = &config.base_url {
                enricher = enricher.with_base_url(base_url.trim_end_matches('/'));
            }
            Arc::new(enricher)
        }
        _ => return Ok(None),
    };
    info!(provider = enricher.name(), "Metadata enrichment enabled");
    Ok(Some(enricher))
}
