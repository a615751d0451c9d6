//! watchlog-server - personal TV season watch log
//!
//! Loads the collection through the startup fallback chain, keeps it in
//! memory behind the library view model, and serves the JSON API.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use watchlog_common::bootstrap::bootstrap;
use watchlog_common::config::{
    config_file_path, database_path, resolve_root_folder, StorageBackend, TomlConfig, ROOT_FOLDER_ENV,
};
use watchlog_common::db::init_database;
use watchlog_common::enrichment::build_enricher;
use watchlog_common::events::EventBus;
use watchlog_common::storage::static_file::StaticLocation;
use watchlog_common::storage::{
    spawn_snapshot_poller, FirestoreStore, GithubFileStore, LocalStore, SeasonSource, SeasonStore, StaticFileSource,
    StoreSource,
};
use watchlog_common::Library;
use watchlog_server::{build_router, AppState, ServiceInfo};

/// Command-line arguments; each falls back to its environment variable,
/// then the config file, then the compiled default
#[derive(Debug, Parser)]
#[command(name = "watchlog-server", version, about = "Personal TV season watch log")]
struct Args {
    /// Data folder holding watchlog.db
    #[arg(long)]
    root_folder: Option<String>,

    /// Config file (default: ~/.config/watchlog/config.toml)
    #[arg(long, env = "WATCHLOG_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:5780
    #[arg(long, env = "WATCHLOG_BIND")]
    bind: Option<String>,

    /// Storage backend: local, remote-documents or github
    #[arg(long, env = "WATCHLOG_BACKEND")]
    backend: Option<String>,

    /// Read-only seed file (path or http(s) URL)
    #[arg(long, env = "WATCHLOG_STATIC_SOURCE")]
    static_source: Option<String>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, env = "WATCHLOG_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(config_file_path);
    let loaded = config_path.as_ref().map(|path| (path, TomlConfig::load_from(path)));

    let log_level = args.log_level.clone().unwrap_or_else(|| match &loaded {
        Some((_, Ok(config))) => config.logging.level.clone(),
        _ => "info".to_string(),
    });
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting watchlog-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut config = match loaded {
        Some((path, Ok(config))) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Some((path, Err(e))) => {
            warn!("Ignoring config file {}: {}; using defaults", path.display(), e);
            TomlConfig::default()
        }
        None => {
            info!("No config file found, using defaults");
            TomlConfig::default()
        }
    };
    config.apply_env_overrides();

    let backend = match &args.backend {
        Some(raw) => raw.parse::<StorageBackend>()?,
        None => config.storage.backend,
    };
    let static_source = args.static_source.clone().or_else(|| config.storage.static_source.clone());
    let bind = args.bind.clone().unwrap_or_else(|| config.bind_address());

    let store: Arc<dyn SeasonStore> = match backend {
        StorageBackend::Local => {
            let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &config);
            let db_path = database_path(&root_folder);
            info!("Database path: {}", db_path.display());
            Arc::new(LocalStore::new(init_database(&db_path).await?))
        }
        StorageBackend::RemoteDocuments => Arc::new(FirestoreStore::new(config.firestore_config()?)?),
        StorageBackend::Github => Arc::new(GithubFileStore::new(config.github_config()?)?),
    };
    info!(backend = %backend, "Using {} store", store.name());

    let mut sources: Vec<Arc<dyn SeasonSource>> = vec![Arc::new(StoreSource(store.clone()))];
    if let Some(location) = &static_source {
        let location = StaticLocation::parse(location);
        info!("Static data file: {}", location);
        sources.push(Arc::new(StaticFileSource::new(location)?));
    }
    let startup = bootstrap(&sources).await;
    let bootstrap_origin = startup.origin.clone();

    let events = EventBus::new(256);
    let library = Arc::new(Library::new(store.clone(), events, config.share_base_url(&bind)));
    library.install(startup).await;
    info!(origin = %bootstrap_origin, count = library.len().await, "Collection ready");

    let live_sync = store.supports_live_updates();
    if live_sync {
        let interval = config.poll_interval();
        info!("Polling {} for remote changes every {:?}", store.name(), interval);
        let (snapshots, _poller) = spawn_snapshot_poller(store.clone(), interval);
        library.clone().follow_snapshots(snapshots);
    }

    let enricher = match build_enricher(&config.enrichment) {
        Ok(enricher) => enricher,
        Err(e) => {
            warn!("Metadata enrichment disabled: {}", e);
            None
        }
    };

    let state = AppState::new(
        library,
        enricher,
        ServiceInfo {
            backend: store.name().to_string(),
            bootstrap_origin,
            live_sync,
        },
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("watchlog-server listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app).await?;

    Ok(())
}
