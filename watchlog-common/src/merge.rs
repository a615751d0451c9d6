//! Merge-on-import
//!
//! Incoming records whose id already exists locally are dropped; the rest are
//! prepended to the collection in their incoming order. Records are never
//! merged field by field.

use serde::Serialize;
use std::collections::HashSet;

use crate::models::ShowSeason;
use crate::{Error, Result};

/// What an import would do (or did)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergePlan {
    /// Ids that will be prepended, in incoming order
    pub added: Vec<String>,
    /// Ids dropped because they already exist (or repeat within the import)
    pub skipped: Vec<String>,
}

impl MergePlan {
    pub fn added_count(&self) -> usize {
        self.added.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Records to prepend plus the plan describing them
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub plan: MergePlan,
    pub novel: Vec<ShowSeason>,
}

/// Set difference of `incoming` against `existing`, by id
///
/// Within `incoming`, only the first occurrence of an id is kept.
pub fn partition_incoming(existing: &[ShowSeason], incoming: Vec<ShowSeason>) -> MergeOutcome {
    let mut known: HashSet<String> = existing.iter().map(|s| s.id.clone()).collect();
    let mut plan = MergePlan::default();
    let mut novel = Vec::new();

    for season in incoming {
        if known.insert(season.id.clone()) {
            plan.added.push(season.id.clone());
            novel.push(season);
        } else {
            plan.skipped.push(season.id);
        }
    }

    MergeOutcome { plan, novel }
}

/// Parse an import document: a JSON array of season records
///
/// Anything else is rejected with a message fit for the user. Each record is
/// brought within the model invariants with [`ShowSeason::sanitize`].
pub fn parse_import(json: &str) -> Result<Vec<ShowSeason>> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| Error::InvalidInput(format!("Import file is not valid JSON: {}", e)))?;

    let serde_json::Value::Array(items) = value else {
        return Err(Error::InvalidInput(
            "Import file must contain a JSON array of seasons".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<ShowSeason>(item)
                .map(ShowSeason::sanitize)
                .map_err(|e| Error::InvalidInput(format!("Invalid season at index {}: {}", index, e)))
        })
        .collect()
}
