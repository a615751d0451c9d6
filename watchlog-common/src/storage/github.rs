//! Commit-based remote file (GitHub contents API)
//!
//! The collection is one JSON file at a fixed path in a repository. Every
//! write reads the file's current revision marker (blob `sha`) and submits a
//! full overwrite tagged with it. The API rejects the commit when the marker
//! is stale; that rejection surfaces as a plain [`Error::Remote`] with no
//! retry or rebase.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ensure_success, http_client, Mutation, SeasonStore};
use crate::models::ShowSeason;
use crate::{Error, Result};

const GITHUB_API_URL: &str = "https://api.github.com";

/// Repository coordinates and credentials
#[derive(Debug, Clone)]
pub struct GithubFileConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub branch: Option<String>,
    /// Override for GitHub Enterprise and tests
    pub api_url: Option<String>,
}

/// Contents API file metadata
#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Debug, Serialize)]
struct UpdateRequest<'a> {
    message: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    content: Option<UpdatedContent>,
}

#[derive(Debug, Deserialize)]
struct UpdatedContent {
    sha: String,
}

/// File contents plus the revision marker they were read at
#[derive(Debug, Clone, PartialEq)]
pub struct Revision {
    pub sha: String,
    pub seasons: Vec<ShowSeason>,
}

/// GitHub-file-backed season store
pub struct GithubFileStore {
    http: reqwest::Client,
    config: GithubFileConfig,
}

impl GithubFileStore {
    pub fn new(config: GithubFileConfig) -> Result<Self> {
        for (field, value) in [
            ("token", &config.token),
            ("owner", &config.owner),
            ("repo", &config.repo),
            ("path", &config.path),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("GitHub sync {} is empty", field)));
            }
        }
        Ok(Self {
            http: http_client()?,
            config,
        })
    }

    fn contents_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_url.as_deref().unwrap_or(GITHUB_API_URL),
            self.config.owner,
            self.config.repo,
            self.config.path.trim_start_matches('/')
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.config.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// Fetch the file and its revision marker; `None` when it does not exist yet
    pub async fn fetch_revision(&self) -> Result<Option<Revision>> {
        let mut request = self.authorized(self.http.get(self.contents_url()));
        if let Some(branch) = &self.config.branch {
            request = request.query(&[("ref", branch.as_str())]);
        }

        let response = request.send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let contents: ContentsResponse = ensure_success(response).await?.json().await?;
        let seasons = decode_contents(&contents)?;
        Ok(Some(Revision {
            sha: contents.sha,
            seasons,
        }))
    }

    /// Overwrite the file, tagged with the marker it was read at
    pub async fn commit(&self, seasons: &[ShowSeason], sha: Option<&str>, message: String) -> Result<String> {
        let body = UpdateRequest {
            message,
            content: encode_contents(seasons)?,
            sha,
            branch: self.config.branch.as_deref(),
        };

        let response = self
            .authorized(self.http.put(self.contents_url()))
            .json(&body)
            .send()
            .await?;
        let updated: UpdateResponse = ensure_success(response).await?.json().await?;
        let new_sha = updated.content.map(|c| c.sha).unwrap_or_default();
        debug!(sha = %new_sha, count = seasons.len(), "Committed season file");
        Ok(new_sha)
    }

    async fn overwrite(&self, seasons: &[ShowSeason], message: String) -> Result<()> {
        let current = self.fetch_revision().await?;
        self.commit(seasons, current.as_ref().map(|r| r.sha.as_str()), message)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SeasonStore for GithubFileStore {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn load_all(&self) -> Result<Option<Vec<ShowSeason>>> {
        Ok(self.fetch_revision().await?.map(|r| r.seasons))
    }

    async fn apply(&self, mutation: Mutation<'_>, next: &[ShowSeason]) -> Result<()> {
        self.overwrite(next, commit_message(&mutation)).await
    }

    async fn replace_all(&self, seasons: &[ShowSeason]) -> Result<()> {
        self.overwrite(seasons, format!("Replace watch log ({} seasons)", seasons.len()))
            .await?;
        info!(count = seasons.len(), "Replaced remote season file");
        Ok(())
    }

    fn authoritative(&self) -> bool {
        true
    }
}

fn commit_message(mutation: &Mutation<'_>) -> String {
    match mutation {
        Mutation::Upsert(season) => format!("Update {} season {}", season.title, season.season),
        Mutation::Remove(id) => format!("Remove season {}", id),
        Mutation::Insert(seasons) => format!("Import {} seasons", seasons.len()),
    }
}

/// Pretty JSON, base64-encoded for the contents API
fn encode_contents(seasons: &[ShowSeason]) -> Result<String> {
    let json = serde_json::to_string_pretty(seasons)?;
    Ok(STANDARD.encode(json))
}

fn decode_contents(contents: &ContentsResponse) -> Result<Vec<ShowSeason>> {
    if !contents.encoding.is_empty() && contents.encoding != "base64" {
        return Err(Error::InvalidInput(format!(
            "Unsupported contents encoding '{}'",
            contents.encoding
        )));
    }
    // The API wraps base64 at 60 columns
    let compact: String = contents.content.split_whitespace().collect();
    if compact.is_empty() {
        return Ok(Vec::new());
    }
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| Error::InvalidInput(format!("Remote file is not valid base64: {}", e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::InvalidInput(format!("Remote file is not a season list: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeasonDraft;

    fn config() -> GithubFileConfig {
        GithubFileConfig {
            token: "ghp_test".into(),
            owner: "someone".into(),
            repo: "tv".into(),
            path: "/data/seasons.json".into(),
            branch: Some("main".into()),
            api_url: None,
        }
    }

    fn season(id: &str) -> ShowSeason {
        SeasonDraft {
            title: "Atlanta".into(),
            season: 3,
            ..Default::default()
        }
        .into_season(id.to_string(), 1_650_000_000_000)
    }

    #[test]
    fn test_contents_url() {
        let store = GithubFileStore::new(config()).unwrap();
        assert_eq!(
            store.contents_url(),
            "https://api.github.com/repos/someone/tv/contents/data/seasons.json"
        );
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let mut cfg = config();
        cfg.token = String::new();
        assert!(matches!(GithubFileStore::new(cfg), Err(Error::Config(_))));
    }

    #[test]
    fn test_contents_round_trip_with_line_wrapping() {
        let seasons = vec![season("a"), season("b")];
        let encoded = encode_contents(&seasons).unwrap();
        let wrapped: String = encoded
            .as_bytes()
            .chunks(60)
            .map(|chunk| format!("{}\n", String::from_utf8_lossy(chunk)))
            .collect();

        let response = ContentsResponse {
            sha: "abc123".into(),
            content: wrapped,
            encoding: "base64".into(),
        };
        assert_eq!(decode_contents(&response).unwrap(), seasons);
    }

    #[test]
    fn test_update_request_shape() {
        let body = UpdateRequest {
            message: "Import 2 seasons".into(),
            content: "W10=".into(),
            sha: Some("abc"),
            branch: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["sha"], "abc");
        assert!(value.get("branch").is_none());
        assert_eq!(commit_message(&Mutation::Remove("x")), "Remove season x");
    }
}
