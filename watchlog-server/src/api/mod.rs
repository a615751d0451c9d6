//! HTTP API handlers for watchlog-server

pub mod enrich;
pub mod health;
pub mod seasons;
pub mod sse;
pub mod stats;
pub mod status;
pub mod transfer;

use serde::{de::Error as _, Deserialize, Deserializer};

pub use enrich::enrich_season;
pub use health::health_routes;
pub use seasons::{create_season, delete_season, get_season, list_seasons, list_years, update_season};
pub use sse::event_stream;
pub use stats::get_stats;
pub use status::get_status;
pub use transfer::{export_collection, get_share_url, import_collection, import_share};

/// `?confirm=true` on destructive requests
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmParams {
    #[serde(default, deserialize_with = "flag")]
    pub confirm: bool,
}

/// Query flag accepting `true`/`false`, `1`/`0`, `yes`/`no`; empty is false
fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        other => Err(D::Error::custom(format!("invalid confirm flag: {}", other))),
    }
}
