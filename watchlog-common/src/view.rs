//! Filter/sort view over the in-memory collection
//!
//! Pure functions: the collection is never mutated, a new ordered sequence is
//! returned. Sorting is stable, so ties keep collection order.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use crate::models::ShowSeason;
use crate::Error;

/// Sort order for the season table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortKey {
    /// Newest record first (creation timestamp)
    #[default]
    #[serde(rename = "recent")]
    Recent,
    #[serde(rename = "rating-desc")]
    RatingDesc,
    #[serde(rename = "rating-asc")]
    RatingAsc,
    #[serde(rename = "title-asc")]
    TitleAsc,
    #[serde(rename = "title-desc")]
    TitleDesc,
    #[serde(rename = "season-asc")]
    SeasonAsc,
    #[serde(rename = "season-desc")]
    SeasonDesc,
    /// Start date descending; records without one use their creation date
    #[serde(rename = "start-desc")]
    StartDesc,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Recent => "recent",
            SortKey::RatingDesc => "rating-desc",
            SortKey::RatingAsc => "rating-asc",
            SortKey::TitleAsc => "title-asc",
            SortKey::TitleDesc => "title-desc",
            SortKey::SeasonAsc => "season-asc",
            SortKey::SeasonDesc => "season-desc",
            SortKey::StartDesc => "start-desc",
        }
    }

    fn compare(&self, a: &ShowSeason, b: &ShowSeason) -> Ordering {
        match self {
            SortKey::Recent => b.created_at.cmp(&a.created_at),
            SortKey::RatingDesc => b.rating.total_cmp(&a.rating),
            SortKey::RatingAsc => a.rating.total_cmp(&b.rating),
            SortKey::TitleAsc => compare_titles(&a.title, &b.title),
            SortKey::TitleDesc => compare_titles(&b.title, &a.title),
            SortKey::SeasonAsc => a.season.cmp(&b.season),
            SortKey::SeasonDesc => b.season.cmp(&a.season),
            SortKey::StartDesc => b.start_or_created().cmp(&a.start_or_created()),
        }
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "recent" => Ok(SortKey::Recent),
            "rating-desc" => Ok(SortKey::RatingDesc),
            "rating-asc" => Ok(SortKey::RatingAsc),
            "title-asc" => Ok(SortKey::TitleAsc),
            "title-desc" => Ok(SortKey::TitleDesc),
            "season-asc" => Ok(SortKey::SeasonAsc),
            "season-desc" => Ok(SortKey::SeasonDesc),
            "start-desc" => Ok(SortKey::StartDesc),
            other => Err(Error::InvalidInput(format!("Unknown sort key: {}", other))),
        }
    }
}

/// Case-insensitive title order, original spelling as tie-break
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Parameters of one table view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewQuery {
    /// Case-insensitive substring; empty matches everything
    #[serde(default, rename = "q")]
    pub query: String,
    /// Effective year filter
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub sort: SortKey,
}

impl ViewQuery {
    pub fn new(query: impl Into<String>, year: Option<i32>, sort: SortKey) -> Self {
        Self {
            query: query.into(),
            year,
            sort,
        }
    }
}

/// True if `season` matches the search text
///
/// Matched against title, network, status display name and every genre tag.
pub fn matches_query(season: &ShowSeason, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    season.title.to_lowercase().contains(&needle)
        || season.network.to_lowercase().contains(&needle)
        || season.status.as_str().to_lowercase().contains(&needle)
        || season
            .genres
            .iter()
            .any(|g| g.to_lowercase().contains(&needle))
}

/// Year used for the year filter and per-year statistics
pub fn effective_year(season: &ShowSeason) -> i32 {
    season.effective_date().year()
}

/// Filter then sort, returning a new sequence
pub fn apply_view(seasons: &[ShowSeason], view: &ViewQuery) -> Vec<ShowSeason> {
    let mut result: Vec<ShowSeason> = seasons
        .iter()
        .filter(|s| matches_query(s, &view.query))
        .filter(|s| view.year.map_or(true, |year| effective_year(s) == year))
        .cloned()
        .collect();

    // sort_by is stable
    result.sort_by(|a, b| view.sort.compare(a, b));
    result
}

/// Distinct effective years, newest first
pub fn available_years(seasons: &[ShowSeason]) -> Vec<i32> {
    let mut years: Vec<i32> = seasons.iter().map(effective_year).collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}
