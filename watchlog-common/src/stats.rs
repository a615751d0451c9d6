//! Aggregate statistics over the collection

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::models::{SeasonStatus, ShowSeason};
use crate::view::effective_year;

/// Number of entries kept in the genre and network rankings
pub const TOP_N: usize = 10;

/// Name with an occurrence count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountEntry {
    pub name: String,
    pub count: usize,
}

/// Statistics shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub total_seasons: usize,
    /// Mean user rating rounded to one decimal; `None` for an empty collection
    pub average_rating: Option<f64>,
    /// Every status is present, zero when unused
    pub by_status: BTreeMap<String, usize>,
    pub total_episodes: u64,
    /// Episodes × runtime over records that carry both, in hours
    pub hours_watched: f64,
    pub top_genres: Vec<CountEntry>,
    pub top_networks: Vec<CountEntry>,
    /// Whole-star buckets "1" through "5"
    pub rating_distribution: BTreeMap<String, usize>,
    pub seasons_per_year: BTreeMap<i32, usize>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn rank(counts: HashMap<String, usize>) -> Vec<CountEntry> {
    let mut entries: Vec<CountEntry> = counts
        .into_iter()
        .map(|(name, count)| CountEntry { name, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    entries.truncate(TOP_N);
    entries
}

/// Star bucket for a rating: floor, capped to 1..=5
fn rating_bucket(rating: f64) -> u8 {
    (rating.floor() as i64).clamp(1, 5) as u8
}

/// Compute dashboard statistics
pub fn compute_stats(seasons: &[ShowSeason]) -> CollectionStats {
    let total_seasons = seasons.len();

    let average_rating = if seasons.is_empty() {
        None
    } else {
        let sum: f64 = seasons.iter().map(|s| s.rating).sum();
        Some(round1(sum / total_seasons as f64))
    };

    let mut by_status: BTreeMap<String, usize> = SeasonStatus::ALL
        .iter()
        .map(|status| (status.as_str().to_string(), 0))
        .collect();
    let mut rating_distribution: BTreeMap<String, usize> =
        (1..=5).map(|star| (star.to_string(), 0)).collect();
    let mut genres: HashMap<String, usize> = HashMap::new();
    let mut networks: HashMap<String, usize> = HashMap::new();
    let mut seasons_per_year: BTreeMap<i32, usize> = BTreeMap::new();
    let mut total_episodes = 0u64;
    let mut minutes = 0u64;

    for season in seasons {
        *by_status.entry(season.status.as_str().to_string()).or_default() += 1;
        *rating_distribution
            .entry(rating_bucket(season.rating).to_string())
            .or_default() += 1;
        for genre in &season.genres {
            *genres.entry(genre.clone()).or_default() += 1;
        }
        let network = season.network.trim();
        if !network.is_empty() {
            *networks.entry(network.to_string()).or_default() += 1;
        }
        *seasons_per_year.entry(effective_year(season)).or_default() += 1;
        total_episodes += season.episodes.unwrap_or(0) as u64;
        minutes += season.minutes_watched().unwrap_or(0);
    }

    CollectionStats {
        total_seasons,
        average_rating,
        by_status,
        total_episodes,
        hours_watched: round1(minutes as f64 / 60.0),
        top_genres: rank(genres),
        top_networks: rank(networks),
        rating_distribution,
        seasons_per_year,
    }
}
