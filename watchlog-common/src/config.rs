//! Configuration loading and root folder resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file (`~/.config/watchlog/config.toml`)
//! 4. Compiled default
//!
//! A missing or malformed config file never aborts startup; it is logged and
//! the compiled defaults are used.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::storage::{FirestoreConfig, GithubFileConfig};
use crate::{Error, Result};

pub const DEFAULT_BIND: &str = "127.0.0.1:5780";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_FIRESTORE_COLLECTION: &str = "seasons";
pub const DEFAULT_GITHUB_PATH: &str = "tv-tracker-data.json";
pub const DATABASE_FILE: &str = "watchlog.db";

pub const ROOT_FOLDER_ENV: &str = "WATCHLOG_ROOT_FOLDER";
pub const TMDB_API_KEY_ENV: &str = "WATCHLOG_TMDB_API_KEY";
pub const GEMINI_API_KEY_ENV: &str = "WATCHLOG_GEMINI_API_KEY";
pub const GITHUB_TOKEN_ENV: &str = "WATCHLOG_GITHUB_TOKEN";
pub const FIRESTORE_API_KEY_ENV: &str = "WATCHLOG_FIRESTORE_API_KEY";

/// Contents of `config.toml`; every section is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub firestore: FirestoreSection,
    pub github: GithubSection,
    pub enrichment: EnrichmentConfig,
    pub share: ShareConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Which store the collection is persisted to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    #[default]
    Local,
    RemoteDocuments,
    Github,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Local => "local",
            StorageBackend::RemoteDocuments => "remote-documents",
            StorageBackend::Github => "github",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "remote-documents" | "firestore" => Ok(StorageBackend::RemoteDocuments),
            "github" => Ok(StorageBackend::Github),
            other => Err(Error::Config(format!(
                "Unknown storage backend '{}' (expected local, remote-documents or github)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Read-only seed file, filesystem path or http(s) URL
    pub static_source: Option<String>,
    pub poll_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            static_source: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FirestoreSection {
    pub project_id: Option<String>,
    pub api_key: Option<String>,
    pub collection: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GithubSection {
    pub token: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub path: Option<String>,
    pub branch: Option<String>,
    pub api_url: Option<String>,
}

/// Which enrichment service to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentProvider {
    Tmdb,
    Gemini,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Explicit choice; otherwise the first provider with a key wins (TMDB first)
    pub provider: Option<EnrichmentProvider>,
    pub tmdb_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    /// API root of the chosen provider, for proxies
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Page that accepts `?data=`; defaults to the server's own address
    pub base_url: Option<String>,
}

impl TomlConfig {
    /// Read and parse `path`; callers fall back to defaults on error
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))
    }

    /// Credentials from the environment take precedence over the file
    pub fn apply_env_overrides(&mut self) {
        override_from_env(&mut self.enrichment.tmdb_api_key, TMDB_API_KEY_ENV);
        override_from_env(&mut self.enrichment.gemini_api_key, GEMINI_API_KEY_ENV);
        override_from_env(&mut self.github.token, GITHUB_TOKEN_ENV);
        override_from_env(&mut self.firestore.api_key, FIRESTORE_API_KEY_ENV);
    }

    pub fn bind_address(&self) -> String {
        self.bind.clone().unwrap_or_else(|| DEFAULT_BIND.to_string())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.storage.poll_interval_secs.max(1))
    }

    pub fn share_base_url(&self, bind: &str) -> String {
        self.share
            .base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}/", bind))
    }

    pub fn firestore_config(&self) -> Result<FirestoreConfig> {
        let project_id = non_empty(self.firestore.project_id.as_deref())
            .ok_or_else(|| Error::Config("firestore.project_id is required".to_string()))?;
        Ok(FirestoreConfig {
            project_id: project_id.to_string(),
            api_key: non_empty(self.firestore.api_key.as_deref()).map(str::to_string),
            collection: non_empty(self.firestore.collection.as_deref())
                .unwrap_or(DEFAULT_FIRESTORE_COLLECTION)
                .to_string(),
            base_url: self.firestore.base_url.clone(),
        })
    }

    pub fn github_config(&self) -> Result<GithubFileConfig> {
        let require = |value: &Option<String>, key: &str| {
            non_empty(value.as_deref())
                .map(str::to_string)
                .ok_or_else(|| Error::Config(format!("github.{} is required", key)))
        };
        Ok(GithubFileConfig {
            token: require(&self.github.token, "token")?,
            owner: require(&self.github.owner, "owner")?,
            repo: require(&self.github.repo, "repo")?,
            path: non_empty(self.github.path.as_deref())
                .unwrap_or(DEFAULT_GITHUB_PATH)
                .to_string(),
            branch: non_empty(self.github.branch.as_deref()).map(str::to_string),
            api_url: self.github.api_url.clone(),
        })
    }
}

fn override_from_env(slot: &mut Option<String>, var: &str) {
    if let Ok(value) = std::env::var(var) {
        if !value.trim().is_empty() {
            *slot = Some(value);
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Root folder resolution: CLI, then environment, then TOML, then OS default
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Path of the user config file, if one exists
pub fn config_file_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("watchlog").join("config.toml"));
    if let Some(path) = user_config.filter(|p| p.exists()) {
        return Some(path);
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/watchlog/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }
    None
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("watchlog"))
        .unwrap_or_else(|| PathBuf::from("./watchlog_data"))
}

/// SQLite file holding the local key-value store
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}
