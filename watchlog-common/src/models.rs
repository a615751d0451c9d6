//! Season record data model
//!
//! `ShowSeason` is the only persisted entity. Its JSON form (camelCase field
//! names) is shared by the local store, the remote stores, export files and
//! share payloads, so deserialization is lenient: unknown fields are ignored,
//! missing optional fields default, and hand-entered values such as `""` or
//! `"8.5"` are accepted where a date or number is expected.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Lowest allowed user rating
pub const MIN_RATING: f64 = 1.0;
/// Highest allowed user rating
pub const MAX_RATING: f64 = 5.0;
/// Rating used when a draft leaves it blank
pub const DEFAULT_RATING: f64 = 3.0;

/// Lifecycle status of a tracked season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SeasonStatus {
    Watching,
    #[default]
    Completed,
    Recommended,
    #[serde(rename = "On Hold")]
    OnHold,
    Dropped,
}

impl SeasonStatus {
    /// All statuses in display order
    pub const ALL: [SeasonStatus; 5] = [
        SeasonStatus::Watching,
        SeasonStatus::Completed,
        SeasonStatus::Recommended,
        SeasonStatus::OnHold,
        SeasonStatus::Dropped,
    ];

    /// Display name (identical to the wire value)
    pub fn as_str(&self) -> &'static str {
        match self {
            SeasonStatus::Watching => "Watching",
            SeasonStatus::Completed => "Completed",
            SeasonStatus::Recommended => "Recommended",
            SeasonStatus::OnHold => "On Hold",
            SeasonStatus::Dropped => "Dropped",
        }
    }
}

impl std::fmt::Display for SeasonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Third-party aggregate scores, each on its source's own scale
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRatings {
    /// IMDb user score (0-10)
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub imdb: Option<f64>,
    /// Rotten Tomatoes critics score (0-100)
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub rotten_tomatoes: Option<f64>,
    /// Metacritic metascore (0-100)
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub metacritic: Option<f64>,
    /// TMDB vote average (0-10)
    #[serde(default, deserialize_with = "lenient::number", skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<f64>,
}

impl AggregateRatings {
    /// Fill every empty score from `other`
    pub fn fill_missing(&mut self, other: &AggregateRatings) {
        self.imdb = self.imdb.or(other.imdb);
        self.rotten_tomatoes = self.rotten_tomatoes.or(other.rotten_tomatoes);
        self.metacritic = self.metacritic.or(other.metacritic);
        self.tmdb = self.tmdb.or(other.tmdb);
    }
}

/// Links to the season on external sites
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalUrls {
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub imdb: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub rotten_tomatoes: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub metacritic: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub wikipedia: Option<String>,
}

impl ExternalUrls {
    /// Fill every empty link from `other`
    pub fn fill_missing(&mut self, other: &ExternalUrls) {
        fn fill(slot: &mut Option<String>, value: &Option<String>) {
            if slot.is_none() {
                slot.clone_from(value);
            }
        }
        fill(&mut self.imdb, &other.imdb);
        fill(&mut self.rotten_tomatoes, &other.rotten_tomatoes);
        fill(&mut self.metacritic, &other.metacritic);
        fill(&mut self.tmdb, &other.tmdb);
        fill(&mut self.wikipedia, &other.wikipedia);
    }
}

/// Citation returned by a metadata enricher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingLink {
    #[serde(default)]
    pub title: String,
    pub uri: String,
}

/// One tracked season of a show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowSeason {
    /// Opaque unique identifier; blank until [`ShowSeason::sanitize`] mints one
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_season", deserialize_with = "lenient::season")]
    pub season: u32,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub genres: Vec<String>,
    /// User rating in [1.0, 5.0]
    #[serde(default = "default_rating", deserialize_with = "lenient::rating")]
    pub rating: f64,
    #[serde(default)]
    pub ratings: AggregateRatings,
    #[serde(default)]
    pub urls: ExternalUrls,
    #[serde(default)]
    pub status: SeasonStatus,
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default, deserialize_with = "lenient::date", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::date", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub ongoing: bool,
    /// Creation time in epoch milliseconds
    #[serde(default = "now_millis", deserialize_with = "lenient::timestamp")]
    pub created_at: i64,
    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub episodes: Option<u32>,
    /// Average episode runtime in minutes
    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<GroundingLink>>,
}

impl ShowSeason {
    /// Creation date (UTC) derived from `created_at`
    pub fn created_date(&self) -> NaiveDate {
        chrono::DateTime::from_timestamp_millis(self.created_at)
            .map(|dt| dt.date_naive())
            .unwrap_or_default()
    }

    /// End date, else start date, else creation date
    pub fn effective_date(&self) -> NaiveDate {
        self.end_date
            .or(self.start_date)
            .unwrap_or_else(|| self.created_date())
    }

    /// Start date, else creation date
    pub fn start_or_created(&self) -> NaiveDate {
        self.start_date.unwrap_or_else(|| self.created_date())
    }

    /// Minutes watched, when both episode count and runtime are known
    pub fn minutes_watched(&self) -> Option<u64> {
        match (self.episodes, self.runtime) {
            (Some(episodes), Some(runtime)) => Some(episodes as u64 * runtime as u64),
            _ => None,
        }
    }

    /// Bring an externally supplied record within the model's invariants
    ///
    /// Missing ids are minted, the rating is clamped and genres deduplicated.
    /// Used on import; stored collections are read as-is.
    pub fn sanitize(mut self) -> Self {
        if self.id.trim().is_empty() {
            self.id = crate::uuid_utils::generate().to_string();
        }
        self.rating = clamp_rating(self.rating);
        self.genres = normalize_genres(std::mem::take(&mut self.genres));
        if self.season == 0 {
            self.season = 1;
        }
        self
    }
}

/// User-editable fields of a season record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_season", deserialize_with = "lenient::season")]
    pub season: u32,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub ratings: AggregateRatings,
    #[serde(default)]
    pub urls: ExternalUrls,
    #[serde(default)]
    pub status: SeasonStatus,
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default, deserialize_with = "lenient::date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub ongoing: bool,
    #[serde(default, deserialize_with = "lenient::count")]
    pub episodes: Option<u32>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub sources: Option<Vec<GroundingLink>>,
}

impl SeasonDraft {
    /// Check the draft against the record invariants
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput("Title is required".to_string()));
        }
        if self.season == 0 {
            return Err(Error::InvalidInput("Season number must be at least 1".to_string()));
        }
        if let Some(rating) = self.rating {
            if !(MIN_RATING..=MAX_RATING).contains(&rating) {
                return Err(Error::InvalidInput(format!(
                    "Rating must be between {:.1} and {:.1}, got {}",
                    MIN_RATING, MAX_RATING, rating
                )));
            }
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(Error::InvalidInput(format!(
                    "End date {} is before start date {}",
                    end, start
                )));
            }
        }
        if self.episodes == Some(0) {
            return Err(Error::InvalidInput("Episode count must be positive".to_string()));
        }
        if self.runtime == Some(0) {
            return Err(Error::InvalidInput("Runtime must be positive".to_string()));
        }
        Ok(())
    }

    /// Build a record from a validated draft
    pub fn into_season(self, id: String, created_at: i64) -> ShowSeason {
        ShowSeason {
            id,
            title: self.title.trim().to_string(),
            season: self.season,
            network: self.network.trim().to_string(),
            genres: normalize_genres(self.genres),
            rating: self.rating.unwrap_or(DEFAULT_RATING),
            ratings: self.ratings,
            urls: self.urls,
            status: self.status,
            review: self.review,
            synopsis: self.synopsis,
            start_date: self.start_date,
            end_date: self.end_date,
            ongoing: self.ongoing,
            created_at,
            episodes: self.episodes,
            runtime: self.runtime,
            sources: self.sources.filter(|links| !links.is_empty()),
        }
    }
}

impl From<ShowSeason> for SeasonDraft {
    fn from(season: ShowSeason) -> Self {
        SeasonDraft {
            title: season.title,
            season: season.season,
            network: season.network,
            genres: season.genres,
            rating: Some(season.rating),
            ratings: season.ratings,
            urls: season.urls,
            status: season.status,
            review: season.review,
            synopsis: season.synopsis,
            start_date: season.start_date,
            end_date: season.end_date,
            ongoing: season.ongoing,
            episodes: season.episodes,
            runtime: season.runtime,
            sources: season.sources,
        }
    }
}

/// Clamp a rating into [1.0, 5.0]; NaN becomes the default rating
pub fn clamp_rating(rating: f64) -> f64 {
    if rating.is_nan() {
        DEFAULT_RATING
    } else {
        rating.clamp(MIN_RATING, MAX_RATING)
    }
}

/// Trim genre tags, drop empties and case-insensitive duplicates
pub fn normalize_genres(genres: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    genres
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty() && seen.insert(g.to_lowercase()))
        .collect()
}

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn default_season() -> u32 {
    1
}

fn default_rating() -> f64 {
    DEFAULT_RATING
}

/// Lenient field deserializers for hand-edited and legacy JSON
mod lenient {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer};
    use serde_json::Value;

    fn as_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value.as_ref().and_then(as_f64).filter(|n| n.is_finite()))
    }

    pub fn rating<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(number(d)?.unwrap_or(super::DEFAULT_RATING))
    }

    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        Ok(number(d)?
            .filter(|n| *n >= 1.0 && *n <= u32::MAX as f64)
            .map(|n| n.round() as u32))
    }

    pub fn season<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        Ok(count(d)?.unwrap_or(1))
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Option::<String>::deserialize(d)?;
        Ok(value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
    }

    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        match Value::deserialize(d)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Null => Ok(String::new()),
            other => Err(de::Error::custom(format!("invalid id: {}", other))),
        }
    }

    /// Accepts `null`, `""`, `YYYY-MM-DD` or a full ISO timestamp
    pub fn date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let value = Option::<String>::deserialize(d)?;
        let Some(raw) = value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let day = raw.get(..10).unwrap_or(&raw);
        NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| de::Error::custom(format!("invalid date '{}': {}", raw, e)))
    }

    /// Accepts epoch milliseconds or an RFC 3339 timestamp
    pub fn timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        match Value::deserialize(d)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(|| de::Error::custom("invalid createdAt")),
            Value::String(s) => chrono::DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| dt.timestamp_millis())
                .or_else(|_| s.trim().parse::<i64>())
                .map_err(|_| de::Error::custom(format!("invalid createdAt '{}'", s))),
            Value::Null => Ok(super::now_millis()),
            other => Err(de::Error::custom(format!("invalid createdAt: {}", other))),
        }
    }
}
