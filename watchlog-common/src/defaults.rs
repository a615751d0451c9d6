//! Built-in starter collection, used when every other source is empty

use chrono::NaiveDate;

use crate::models::{AggregateRatings, ExternalUrls, SeasonDraft, SeasonStatus, ShowSeason};

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

/// The hard-coded fallback list
///
/// Ids are fixed so that re-importing the defaults never duplicates them.
pub fn default_seasons() -> Vec<ShowSeason> {
    vec![
        SeasonDraft {
            title: "The Bear".to_string(),
            season: 2,
            network: "FX / Hulu".to_string(),
            genres: vec!["Drama".into(), "Comedy".into()],
            rating: Some(5.0),
            ratings: AggregateRatings {
                imdb: Some(8.6),
                rotten_tomatoes: Some(99.0),
                metacritic: Some(94.0),
                tmdb: None,
            },
            urls: ExternalUrls {
                imdb: Some("https://www.imdb.com/title/tt14452776/".into()),
                ..Default::default()
            },
            status: SeasonStatus::Completed,
            review: "Forks is the best episode of television in years.".to_string(),
            synopsis: "Carmy, Sydney and Richie work to transform the Beef into a fine-dining restaurant.".to_string(),
            start_date: date(2023, 6, 22),
            end_date: date(2023, 6, 25),
            episodes: Some(10),
            runtime: Some(34),
            ..Default::default()
        }
        .into_season("default-the-bear-s2".to_string(), 1_687_651_200_000),
        SeasonDraft {
            title: "Succession".to_string(),
            season: 4,
            network: "HBO".to_string(),
            genres: vec!["Drama".into(), "Satire".into()],
            rating: Some(4.8),
            ratings: AggregateRatings {
                imdb: Some(9.0),
                rotten_tomatoes: Some(97.0),
                metacritic: Some(92.0),
                tmdb: None,
            },
            status: SeasonStatus::Completed,
            review: "A near-perfect final season.".to_string(),
            synopsis: "The sale of Waystar Royco to GoJo looms as the Roy siblings fight for control.".to_string(),
            start_date: date(2023, 3, 26),
            end_date: date(2023, 5, 28),
            episodes: Some(10),
            runtime: Some(62),
            ..Default::default()
        }
        .into_season("default-succession-s4".to_string(), 1_685_318_400_000),
        SeasonDraft {
            title: "Severance".to_string(),
            season: 1,
            network: "Apple TV+".to_string(),
            genres: vec!["Thriller".into(), "Science Fiction".into()],
            rating: Some(4.6),
            ratings: AggregateRatings {
                imdb: Some(8.7),
                rotten_tomatoes: Some(97.0),
                metacritic: Some(83.0),
                tmdb: None,
            },
            status: SeasonStatus::Recommended,
            synopsis: "Lumon employees have their work and personal memories surgically divided.".to_string(),
            start_date: date(2022, 2, 18),
            end_date: date(2022, 4, 8),
            episodes: Some(9),
            runtime: Some(50),
            ..Default::default()
        }
        .into_season("default-severance-s1".to_string(), 1_649_376_000_000),
    ]
}
