//! Generative search lookup (Gemini `generateContent` with Google Search grounding)
//!
//! The model is asked for a single JSON object describing the season. Replies
//! are free text, so the first balanced `{...}` block is extracted and read
//! field by field; anything unreadable is dropped rather than failing the
//! whole lookup.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{Enrichment, MetadataEnricher};
use crate::models::{AggregateRatings, ExternalUrls, GroundingLink};
use crate::storage::{ensure_success, http_client};
use crate::{Error, Result};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiEnricher {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

impl GeminiEnricher {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl MetadataEnricher for GeminiEnricher {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn enrich(&self, title: &str, season: u32) -> Result<Enrichment> {
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(title, season) }] }],
            "tools": [{ "google_search": {} }]
        });

        let response = self
            .http
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        let reply: GenerateResponse = ensure_success(response).await?.json().await?;
        parse_reply(reply)
    }
}

fn build_prompt(title: &str, season: u32) -> String {
    format!(
        "Search the web for season {season} of the TV show \"{title}\". \
         Reply with only one JSON object with these keys: \
         network (string), genres (array of strings), synopsis (string, 2-3 sentences), \
         episodes (number), runtime (average minutes per episode, number), \
         startDate and endDate (YYYY-MM-DD or null), ongoing (boolean), \
         ratings (object with imdb 0-10, rottenTomatoes 0-100, metacritic 0-100), \
         urls (object with imdb, rottenTomatoes, metacritic, wikipedia links). \
         Use null for anything you cannot find."
    )
}

fn parse_reply(reply: GenerateResponse) -> Result<Enrichment> {
    let candidate = reply
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::Remote {
            status: 200,
            message: "Enrichment service returned no candidates".to_string(),
        })?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<Vec<_>>().join(""))
        .unwrap_or_default();
    let object = extract_json_object(&text).ok_or_else(|| Error::Remote {
        status: 200,
        message: "Enrichment reply did not contain a JSON object".to_string(),
    })?;
    let value: Value = serde_json::from_str(object).map_err(|e| Error::Remote {
        status: 200,
        message: format!("Enrichment reply was not valid JSON: {}", e),
    })?;

    let mut enrichment = enrichment_from_value(&value);
    enrichment.sources = candidate
        .grounding_metadata
        .map(|meta| {
            meta.grounding_chunks
                .into_iter()
                .filter_map(|chunk| chunk.web)
                .filter_map(|web| {
                    let uri = web.uri?;
                    Some(GroundingLink {
                        title: web.title.unwrap_or_else(|| uri.clone()),
                        uri,
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    debug!(sources = enrichment.sources.len(), "Parsed enrichment reply");
    Ok(enrichment)
}

/// First balanced `{...}` block in `text`, skipping braces inside strings
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null") && !s.eq_ignore_ascii_case("n/a"))
        .map(str::to_string)
}

/// Leading number of a value such as `8.4`, `"8.4/10"` or `"96%"`
fn number_field(value: &Value, key: &str) -> Option<f64> {
    let number = match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            let end = s
                .char_indices()
                .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
                .map_or(s.len(), |(i, _)| i);
            s[..end].parse::<f64>().ok()
        }
        _ => None,
    };
    number.filter(|n| n.is_finite() && *n >= 0.0)
}

fn count_field(value: &Value, key: &str) -> Option<u32> {
    number_field(value, key)
        .filter(|n| *n >= 1.0 && *n <= u32::MAX as f64)
        .map(|n| n.round() as u32)
}

fn date_field(value: &Value, key: &str) -> Option<NaiveDate> {
    let raw = text_field(value, key)?;
    NaiveDate::parse_from_str(raw.get(..10).unwrap_or(&raw), "%Y-%m-%d").ok()
}

fn enrichment_from_value(value: &Value) -> Enrichment {
    let genres = match value.get("genres") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s.split(',').map(|g| g.trim().to_string()).collect(),
        _ => Vec::new(),
    };

    let empty = Value::Null;
    let ratings = value.get("ratings").unwrap_or(&empty);
    let urls = value.get("urls").unwrap_or(&empty);

    Enrichment {
        network: text_field(value, "network"),
        genres,
        synopsis: text_field(value, "synopsis"),
        episodes: count_field(value, "episodes"),
        runtime: count_field(value, "runtime"),
        start_date: date_field(value, "startDate"),
        end_date: date_field(value, "endDate"),
        ongoing: value.get("ongoing").and_then(Value::as_bool),
        ratings: AggregateRatings {
            imdb: number_field(ratings, "imdb"),
            rotten_tomatoes: number_field(ratings, "rottenTomatoes"),
            metacritic: number_field(ratings, "metacritic"),
            tmdb: number_field(ratings, "tmdb"),
        },
        urls: ExternalUrls {
            imdb: text_field(urls, "imdb"),
            rotten_tomatoes: text_field(urls, "rottenTomatoes"),
            metacritic: text_field(urls, "metacritic"),
            tmdb: text_field(urls, "tmdb"),
            wikipedia: text_field(urls, "wikipedia"),
        },
        sources: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_object_from_prose() {
        let text = "Here you go:\n```json\n{\"synopsis\": \"A {twisty} show\", \"ratings\": {\"imdb\": 8}}\n```\nEnjoy!";
        assert_eq!(
            extract_json_object(text),
            Some("{\"synopsis\": \"A {twisty} show\", \"ratings\": {\"imdb\": 8}}")
        );
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{ unbalanced"), None);
    }

    #[test]
    fn test_parse_reply_with_grounding() {
        let reply: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "{\"network\": \"HBO\", \"genres\": \"Drama, Thriller\", " },
                    { "text": "\"episodes\": \"8\", \"startDate\": \"2024-09-15T00:00:00Z\", \"endDate\": null, \"ongoing\": false, \"ratings\": {\"imdb\": \"8.5/10\", \"rottenTomatoes\": \"96%\", \"metacritic\": null}, \"urls\": {\"wikipedia\": \"N/A\"}}" }
                ]},
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "uri": "https://www.hbo.com/the-penguin", "title": "hbo.com" } },
                    { "retrievedContext": {} }
                ]}
            }]
        }))
        .unwrap();

        let enrichment = parse_reply(reply).unwrap();
        assert_eq!(enrichment.network.as_deref(), Some("HBO"));
        assert_eq!(enrichment.genres, vec!["Drama".to_string(), "Thriller".to_string()]);
        assert_eq!(enrichment.episodes, Some(8));
        assert_eq!(enrichment.start_date, NaiveDate::from_ymd_opt(2024, 9, 15));
        assert_eq!(enrichment.end_date, None);
        assert_eq!(enrichment.ongoing, Some(false));
        assert_eq!(enrichment.ratings.imdb, Some(8.5));
        assert_eq!(enrichment.ratings.rotten_tomatoes, Some(96.0));
        assert_eq!(enrichment.ratings.metacritic, None);
        assert_eq!(enrichment.urls.wikipedia, None);
        assert_eq!(enrichment.sources.len(), 1);
        assert_eq!(enrichment.sources[0].title, "hbo.com");
    }

    #[test]
    fn test_reply_without_candidates_is_remote_error() {
        let reply: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(parse_reply(reply), Err(Error::Remote { .. })));
    }
}
