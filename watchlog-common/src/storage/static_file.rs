//! Static data file source
//!
//! A JSON array read from disk or fetched over HTTP(S). Consulted at startup
//! only when the local store is empty and never written back: exporting
//! produces a file the user can drop in place manually.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use super::{ensure_success, http_client, SeasonSource};
use crate::models::ShowSeason;
use crate::{Error, Result};

/// Where the static file lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticLocation {
    Path(PathBuf),
    Url(String),
}

impl StaticLocation {
    /// `http://` and `https://` locations are fetched, anything else is a path
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            StaticLocation::Url(trimmed.to_string())
        } else {
            StaticLocation::Path(PathBuf::from(trimmed))
        }
    }
}

impl std::fmt::Display for StaticLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StaticLocation::Path(path) => write!(f, "{}", path.display()),
            StaticLocation::Url(url) => f.write_str(url),
        }
    }
}

/// Read-only JSON array source
pub struct StaticFileSource {
    location: StaticLocation,
    http: Option<reqwest::Client>,
}

impl StaticFileSource {
    pub fn new(location: StaticLocation) -> Result<Self> {
        let http = match location {
            StaticLocation::Url(_) => Some(http_client()?),
            StaticLocation::Path(_) => None,
        };
        Ok(Self { location, http })
    }

    async fn read_text(&self) -> Result<Option<String>> {
        match (&self.location, &self.http) {
            (StaticLocation::Path(path), _) => match tokio::fs::read_to_string(path).await {
                Ok(text) => Ok(Some(text)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            },
            (StaticLocation::Url(url), Some(http)) => {
                let response = http.get(url).send().await?;
                if response.status() == reqwest::StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                Ok(Some(ensure_success(response).await?.text().await?))
            }
            (StaticLocation::Url(_), None) => {
                Err(Error::Internal("static URL source without HTTP client".to_string()))
            }
        }
    }
}

#[async_trait]
impl SeasonSource for StaticFileSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch(&self) -> Result<Option<Vec<ShowSeason>>> {
        let Some(text) = self.read_text().await? else {
            debug!(location = %self.location, "Static data file not found");
            return Ok(None);
        };
        let seasons: Vec<ShowSeason> = serde_json::from_str(&text).map_err(|e| {
            Error::InvalidInput(format!("Static data file {} is unreadable: {}", self.location, e))
        })?;
        // Hand-written seed files may leave ids out
        Ok(Some(seasons.into_iter().map(ShowSeason::sanitize).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_parsing() {
        assert_eq!(
            StaticLocation::parse("https://example.com/data.json"),
            StaticLocation::Url("https://example.com/data.json".to_string())
        );
        assert_eq!(
            StaticLocation::parse("./data.json"),
            StaticLocation::Path(PathBuf::from("./data.json"))
        );
    }

    #[tokio::test]
    async fn test_reads_json_array_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"[{"id":"s1","title":"Fleabag","season":2,"rating":5,"status":"Completed","createdAt":1},
                {"title":"Slow Horses","season":3,"createdAt":2}]"#,
        )
        .unwrap();

        let source = StaticFileSource::new(StaticLocation::Path(path)).unwrap();
        let seasons = source.fetch().await.unwrap().unwrap();
        assert_eq!(seasons.len(), 2);
        assert_eq!(seasons[0].title, "Fleabag");
        assert_eq!(seasons[0].rating, 5.0);
        assert_eq!(seasons[0].id, "s1");
        assert!(!seasons[1].id.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_absence_and_garbage_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = StaticFileSource::new(StaticLocation::Path(dir.path().join("nope.json"))).unwrap();
        assert!(missing.fetch().await.unwrap().is_none());

        let garbage_path = dir.path().join("garbage.json");
        std::fs::write(&garbage_path, "<html>404</html>").unwrap();
        let garbage = StaticFileSource::new(StaticLocation::Path(garbage_path)).unwrap();
        assert!(garbage.fetch().await.is_err());
    }
}
