//! # Watchlog Common Library
//!
//! Shared code for the watch log:
//! - Season records, validation and lenient parsing
//! - Filter/sort views, import merging, share links and statistics
//! - Persistence adapters and the startup fallback chain
//! - Metadata enrichment clients
//! - The library view model and its event bus
//! - Configuration loading

pub mod bootstrap;
pub mod config;
pub mod db;
pub mod defaults;
pub mod enrichment;
pub mod error;
pub mod events;
pub mod library;
pub mod merge;
pub mod models;
pub mod share;
pub mod stats;
pub mod storage;
pub mod uuid_utils;
pub mod view;

pub use error::{Error, Result};
pub use library::Library;
pub use models::{SeasonDraft, SeasonStatus, ShowSeason};
