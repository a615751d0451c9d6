//! Remote document collection (Firestore REST API)
//!
//! One document per season, document id = season id. Listings are returned
//! by `createdAt` descending; a document without `createdAt` (added by hand
//! in the console) is dated by its server `createTime`. Writes are single requests with no concurrency
//! token: the last writer wins. Any non-success status is surfaced as
//! [`Error::Remote`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::{ensure_success, http_client, Mutation, SeasonStore};
use crate::models::ShowSeason;
use crate::{Error, Result};

const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const PAGE_SIZE: u32 = 300;

/// Connection settings for one collection
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub api_key: Option<String>,
    pub collection: String,
    /// Override for emulators and tests
    pub base_url: Option<String>,
}

/// Firestore-backed season store
pub struct FirestoreStore {
    http: reqwest::Client,
    config: FirestoreConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
    create_time: Option<String>,
}

impl FirestoreStore {
    pub fn new(config: FirestoreConfig) -> Result<Self> {
        if config.project_id.trim().is_empty() {
            return Err(Error::Config("Firestore project id is empty".to_string()));
        }
        if config.collection.trim().is_empty() {
            return Err(Error::Config("Firestore collection name is empty".to_string()));
        }
        Ok(Self {
            http: http_client()?,
            config,
        })
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            self.config.base_url.as_deref().unwrap_or(FIRESTORE_BASE_URL),
            self.config.project_id,
            self.config.collection
        )
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url(), urlencoding::encode(id))
    }

    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.query(&[("key", key.as_str())]),
            None => request,
        }
    }

    async fn put_document(&self, season: &ShowSeason) -> Result<()> {
        let body = json!({ "fields": encode_fields(season)? });
        // PATCH without an update mask replaces (or creates) the whole document
        let response = self
            .with_key(self.http.patch(self.document_url(&season.id)))
            .json(&body)
            .send()
            .await?;
        ensure_success(response).await?;
        debug!(id = %season.id, "Wrote season document");
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        let response = self
            .with_key(self.http.delete(self.document_url(id)))
            .send()
            .await?;
        ensure_success(response).await?;
        debug!(id = %id, "Deleted season document");
        Ok(())
    }

    async fn list_documents(&self) -> Result<Vec<ShowSeason>> {
        let mut seasons = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            // No server-side orderBy: it would drop documents lacking createdAt
            let mut request = self
                .with_key(self.http.get(self.collection_url()))
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ListResponse = ensure_success(request.send().await?).await?.json().await?;
            for document in page.documents {
                seasons.push(decode_document(document)?);
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        seasons.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(seasons)
    }
}

#[async_trait]
impl SeasonStore for FirestoreStore {
    fn name(&self) -> &'static str {
        "remote-documents"
    }

    async fn load_all(&self) -> Result<Option<Vec<ShowSeason>>> {
        Ok(Some(self.list_documents().await?))
    }

    async fn apply(&self, mutation: Mutation<'_>, _next: &[ShowSeason]) -> Result<()> {
        match mutation {
            Mutation::Upsert(season) => self.put_document(season).await,
            Mutation::Remove(id) => self.delete_document(id).await,
            Mutation::Insert(seasons) => {
                for season in seasons {
                    self.put_document(season).await?;
                }
                Ok(())
            }
        }
    }

    async fn replace_all(&self, seasons: &[ShowSeason]) -> Result<()> {
        let existing = self.list_documents().await?;
        let keep: std::collections::HashSet<&str> = seasons.iter().map(|s| s.id.as_str()).collect();
        for stale in existing.iter().filter(|s| !keep.contains(s.id.as_str())) {
            self.delete_document(&stale.id).await?;
        }
        for season in seasons {
            self.put_document(season).await?;
        }
        info!(count = seasons.len(), "Replaced remote season collection");
        Ok(())
    }

    fn supports_live_updates(&self) -> bool {
        true
    }

    fn authoritative(&self) -> bool {
        true
    }
}

// ============================================================================
// Firestore typed value encoding
// ============================================================================

/// Encode a season as a Firestore `fields` map
pub fn encode_fields(season: &ShowSeason) -> Result<Map<String, Value>> {
    match serde_json::to_value(season)? {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| (key, encode_value(value)))
            .collect()),
        _ => Err(Error::Internal("season did not serialize to an object".to_string())),
    }
}

/// Encode one JSON value as a Firestore typed value
pub fn encode_value(value: Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // Firestore transports 64-bit integers as strings
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.into_iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({
            "mapValue": {
                "fields": map
                    .into_iter()
                    .map(|(k, v)| (k, encode_value(v)))
                    .collect::<Map<String, Value>>()
            }
        }),
    }
}

/// Decode a Firestore typed value into plain JSON
pub fn decode_value(value: &Value) -> Value {
    let Some(object) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = object.iter().next() else {
        return Value::Null;
    };
    match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => inner.clone(),
        "integerValue" => match inner {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            other => other.clone(),
        },
        "doubleValue" => inner.clone(),
        "stringValue" | "timestampValue" | "referenceValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(decode_fields(
            inner.get("fields").and_then(Value::as_object),
        )),
        _ => Value::Null,
    }
}

fn decode_fields(fields: Option<&Map<String, Value>>) -> Map<String, Value> {
    fields
        .map(|fields| {
            fields
                .iter()
                .map(|(k, v)| (k.clone(), decode_value(v)))
                .collect()
        })
        .unwrap_or_default()
}

/// Server creation time in epoch milliseconds; 0 when the listing omits it
fn create_time_millis(document: &Document) -> i64 {
    document
        .create_time
        .as_deref()
        .and_then(|raw| chrono::DateTime::parse_from_rfc3339(raw).ok())
        .map(|time| time.timestamp_millis())
        .unwrap_or(0)
}

fn decode_document(document: Document) -> Result<ShowSeason> {
    let mut object = decode_fields(Some(&document.fields));
    // Document id is authoritative for the record id
    let id = document
        .name
        .rsplit('/')
        .next()
        .map(|segment| urlencoding::decode(segment).map(|s| s.into_owned()).unwrap_or_else(|_| segment.to_string()))
        .unwrap_or_default();
    object.insert("id".to_string(), Value::String(id));
    if object.get("createdAt").map_or(true, Value::is_null) {
        object.insert("createdAt".to_string(), Value::from(create_time_millis(&document)));
    }
    serde_json::from_value(Value::Object(object)).map_err(|e| {
        Error::InvalidInput(format!("Remote document {} is unreadable: {}", document.name, e))
    })
}
