//! Startup data-source selection
//!
//! Sources are tried in the order given (local store, static file, ...).
//! A failing source is logged and skipped; an empty one is skipped unless it
//! is authoritative. When nothing yields data, the built-in defaults are used.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::defaults::default_seasons;
use crate::models::ShowSeason;
use crate::storage::SeasonSource;

/// Name reported when the built-in list was used
pub const DEFAULTS_ORIGIN: &str = "defaults";

/// Collection chosen at startup and where it came from
#[derive(Debug, Clone, Serialize)]
pub struct Bootstrap {
    pub origin: String,
    pub seasons: Vec<ShowSeason>,
}

/// Walk `sources` in priority order and return the first usable collection
pub async fn bootstrap(sources: &[Arc<dyn SeasonSource>]) -> Bootstrap {
    for source in sources {
        match source.fetch().await {
            Ok(Some(seasons)) if !seasons.is_empty() || source.authoritative() => {
                info!(source = source.name(), count = seasons.len(), "Loaded seasons");
                return Bootstrap {
                    origin: source.name().to_string(),
                    seasons,
                };
            }
            Ok(_) => {
                info!(source = source.name(), "No seasons stored, trying next source");
            }
            Err(e) => {
                warn!(source = source.name(), "Failed to read seasons, trying next source: {}", e);
            }
        }
    }

    let seasons = default_seasons();
    info!(count = seasons.len(), "Using built-in default seasons");
    Bootstrap {
        origin: DEFAULTS_ORIGIN.to_string(),
        seasons,
    }
}
