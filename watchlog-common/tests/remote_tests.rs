//! Remote adapters against a local HTTP server standing in for each service

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use watchlog_common::config::EnrichmentConfig;
use watchlog_common::enrichment::{build_enricher, GeminiEnricher, MetadataEnricher};
use watchlog_common::events::EventBus;
use watchlog_common::storage::firestore::encode_fields;
use watchlog_common::storage::static_file::StaticLocation;
use watchlog_common::storage::{
    FirestoreConfig, FirestoreStore, GithubFileConfig, GithubFileStore, Mutation, SeasonSource, SeasonStore,
    StaticFileSource,
};
use watchlog_common::{Error, Library, SeasonDraft, ShowSeason};

type Params = HashMap<String, String>;

/// Serve `router` on an ephemeral port and return its base URL
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn season(id: &str, title: &str, created_at: i64) -> ShowSeason {
    SeasonDraft {
        title: title.to_string(),
        season: 1,
        rating: Some(4.0),
        ..Default::default()
    }
    .into_season(id.to_string(), created_at)
}

// ============================================================================
// GitHub contents API
// ============================================================================

#[derive(Default)]
struct RepoFile {
    /// `None` until the file exists
    sha: Mutex<Option<String>>,
    content: Mutex<String>,
    /// Another writer commits between our read and our write
    racing: AtomicBool,
    refs: Mutex<Vec<Option<String>>>,
    auth: Mutex<Vec<String>>,
    commits: Mutex<Vec<Value>>,
}

impl RepoFile {
    fn holding(seasons: &[ShowSeason]) -> Arc<Self> {
        let repo = Self::default();
        *repo.sha.lock().unwrap() = Some("sha-0".to_string());
        // The contents API wraps base64 at 60 columns
        let encoded = STANDARD.encode(serde_json::to_string(seasons).unwrap());
        let wrapped: Vec<&str> = encoded
            .as_bytes()
            .chunks(60)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect();
        *repo.content.lock().unwrap() = wrapped.join("\n");
        Arc::new(repo)
    }

    fn stored(&self) -> Vec<ShowSeason> {
        let content = self.content.lock().unwrap().replace('\n', "");
        serde_json::from_slice(&STANDARD.decode(content).unwrap()).unwrap()
    }
}

async fn get_contents(
    State(repo): State<Arc<RepoFile>>,
    Query(params): Query<Params>,
    headers: HeaderMap,
) -> Response {
    repo.refs.lock().unwrap().push(params.get("ref").cloned());
    if let Some(auth) = headers.get(header::AUTHORIZATION) {
        repo.auth.lock().unwrap().push(auth.to_str().unwrap().to_string());
    }
    let sha = repo.sha.lock().unwrap().clone();
    match sha {
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response(),
        Some(sha) => {
            let content = repo.content.lock().unwrap().clone();
            Json(json!({ "sha": sha, "content": content, "encoding": "base64" })).into_response()
        }
    }
}

async fn put_contents(State(repo): State<Arc<RepoFile>>, Json(body): Json<Value>) -> Response {
    repo.commits.lock().unwrap().push(body.clone());
    if repo.racing.load(Ordering::SeqCst) {
        let elsewhere = format!("sha-elsewhere-{}", repo.commits.lock().unwrap().len());
        *repo.sha.lock().unwrap() = Some(elsewhere);
    }

    let current = repo.sha.lock().unwrap().clone();
    let sent = body.get("sha").and_then(Value::as_str).map(str::to_string);
    if sent != current {
        return (StatusCode::CONFLICT, Json(json!({ "message": "sha does not match" }))).into_response();
    }

    let next = format!("sha-{}", repo.commits.lock().unwrap().len());
    *repo.sha.lock().unwrap() = Some(next.clone());
    *repo.content.lock().unwrap() = body["content"].as_str().unwrap_or_default().to_string();
    (StatusCode::OK, Json(json!({ "content": { "sha": next } }))).into_response()
}

async fn github_store(repo: Arc<RepoFile>) -> GithubFileStore {
    let router = Router::new()
        .route(
            "/repos/:owner/:repo/contents/*path",
            get(get_contents).put(put_contents),
        )
        .with_state(repo);
    let base = serve(router).await;
    GithubFileStore::new(GithubFileConfig {
        token: "ghp_test".to_string(),
        owner: "someone".to_string(),
        repo: "watchlog-data".to_string(),
        path: "data/seasons.json".to_string(),
        branch: Some("main".to_string()),
        api_url: Some(base),
    })
    .unwrap()
}

#[tokio::test]
async fn test_github_commit_carries_read_marker() {
    let existing = season("a", "Severance", 1_000);
    let repo = RepoFile::holding(std::slice::from_ref(&existing));
    let store = github_store(repo.clone()).await;

    assert_eq!(store.load_all().await.unwrap(), Some(vec![existing.clone()]));

    let added = season("b", "Shrinking", 2_000);
    let next = vec![added.clone(), existing.clone()];
    store.apply(Mutation::Upsert(&added), &next).await.unwrap();

    let commits = repo.commits.lock().unwrap().clone();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0]["sha"], "sha-0");
    assert_eq!(commits[0]["branch"], "main");
    assert!(commits[0]["message"].as_str().unwrap().contains("Shrinking"));
    assert_eq!(repo.stored(), next);

    // Every read asks for the configured branch with the token attached
    assert!(repo.refs.lock().unwrap().iter().all(|r| r.as_deref() == Some("main")));
    assert!(repo.auth.lock().unwrap().iter().all(|a| a == "Bearer ghp_test"));

    let revision = store.fetch_revision().await.unwrap().unwrap();
    assert_eq!(revision.sha, "sha-1");
    assert_eq!(revision.seasons, next);
}

#[tokio::test]
async fn test_github_missing_file_is_absent_then_created() {
    let repo = Arc::new(RepoFile::default());
    let store = github_store(repo.clone()).await;

    assert_eq!(store.fetch_revision().await.unwrap(), None);
    assert_eq!(store.load_all().await.unwrap(), None);

    let first = season("a", "Slow Horses", 1_000);
    store.replace_all(std::slice::from_ref(&first)).await.unwrap();

    // Creating a file sends no marker
    let commits = repo.commits.lock().unwrap().clone();
    assert_eq!(commits.len(), 1);
    assert!(commits[0].get("sha").is_none());
    assert_eq!(store.load_all().await.unwrap(), Some(vec![first]));
}

#[tokio::test]
async fn test_github_conflicting_commit_is_remote_error() {
    let existing = season("a", "Severance", 1_000);
    let repo = RepoFile::holding(std::slice::from_ref(&existing));
    repo.racing.store(true, Ordering::SeqCst);
    let store = Arc::new(github_store(repo.clone()).await);

    let added = season("b", "Shrinking", 2_000);
    let result = store
        .apply(Mutation::Upsert(&added), &[added.clone(), existing.clone()])
        .await;
    assert!(matches!(result, Err(Error::Remote { status: 409, .. })));

    // The collection does not advance past a rejected commit
    let library = Library::new(store, EventBus::new(8), "http://localhost/");
    let created = library
        .create(SeasonDraft {
            title: "Pluribus".to_string(),
            season: 1,
            ..Default::default()
        })
        .await;
    assert!(matches!(created, Err(Error::Remote { status: 409, .. })));
    assert!(library.is_empty().await);
}

// ============================================================================
// Firestore REST API
// ============================================================================

struct StoredDocument {
    id: String,
    fields: Value,
    create_time: String,
}

#[derive(Default)]
struct Collection {
    documents: Mutex<Vec<StoredDocument>>,
    list_queries: Mutex<Vec<Params>>,
    writes: Mutex<Vec<(String, String)>>,
}

/// Answers one document per page regardless of `pageSize`
async fn list_documents(
    State(collection): State<Arc<Collection>>,
    Path((_project, database, _collection)): Path<(String, String, String)>,
    Query(params): Query<Params>,
) -> Response {
    assert_eq!(database, "(default)");
    collection.list_queries.lock().unwrap().push(params.clone());

    let documents = collection.documents.lock().unwrap();
    let start: usize = params.get("pageToken").map_or(0, |t| t.parse().unwrap());
    let mut page = json!({ "documents": [] });
    if let Some(document) = documents.get(start) {
        page["documents"] = json!([{
            "name": format!("projects/demo/databases/(default)/documents/seasons/{}", document.id),
            "fields": document.fields,
            "createTime": document.create_time,
        }]);
    }
    if start + 1 < documents.len() {
        page["nextPageToken"] = json!((start + 1).to_string());
    }
    Json(page).into_response()
}

async fn patch_document(
    State(collection): State<Arc<Collection>>,
    Path((_project, _database, _collection, id)): Path<(String, String, String, String)>,
    Json(body): Json<Value>,
) -> Response {
    collection.writes.lock().unwrap().push(("PATCH".to_string(), id.clone()));
    let mut documents = collection.documents.lock().unwrap();
    let fields = body["fields"].clone();
    match documents.iter().position(|d| d.id == id) {
        Some(index) => documents[index].fields = fields,
        None => documents.push(StoredDocument {
            id,
            fields,
            create_time: "2024-05-01T00:00:00Z".to_string(),
        }),
    }
    Json(json!({})).into_response()
}

async fn delete_document(
    State(collection): State<Arc<Collection>>,
    Path((_project, _database, _collection, id)): Path<(String, String, String, String)>,
) -> Response {
    collection.writes.lock().unwrap().push(("DELETE".to_string(), id.clone()));
    let mut documents = collection.documents.lock().unwrap();
    let before = documents.len();
    documents.retain(|d| d.id != id);
    if documents.len() == before {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": { "code": 404, "status": "NOT_FOUND" } })),
        )
            .into_response();
    }
    Json(json!({})).into_response()
}

async fn firestore_store(collection: Arc<Collection>) -> FirestoreStore {
    let router = Router::new()
        .route(
            "/v1/projects/:project/databases/:database/documents/:collection",
            get(list_documents),
        )
        .route(
            "/v1/projects/:project/databases/:database/documents/:collection/:id",
            patch(patch_document).delete(delete_document),
        )
        .with_state(collection);
    let base = serve(router).await;
    FirestoreStore::new(FirestoreConfig {
        project_id: "demo".to_string(),
        api_key: Some("fs-key".to_string()),
        collection: "seasons".to_string(),
        base_url: Some(format!("{}/v1", base)),
    })
    .unwrap()
}

fn stored_document(season: &ShowSeason, create_time: &str) -> StoredDocument {
    StoredDocument {
        id: season.id.clone(),
        fields: Value::Object(encode_fields(season).unwrap()),
        create_time: create_time.to_string(),
    }
}

#[tokio::test]
async fn test_firestore_follows_page_tokens_and_orders_newest_first() {
    let collection = Arc::new(Collection::default());
    let old = season("old", "The Expanse", 1_000);
    let new = season("new", "Andor", 3_000);
    let mut manual = stored_document(&season("manual", "Dark", 0), "1970-01-01T00:00:02Z");
    manual.fields.as_object_mut().unwrap().remove("createdAt");
    {
        let mut documents = collection.documents.lock().unwrap();
        documents.push(stored_document(&old, "2024-01-01T00:00:00Z"));
        documents.push(manual);
        documents.push(stored_document(&new, "2024-01-02T00:00:00Z"));
    }
    let store = firestore_store(collection.clone()).await;

    let seasons = store.load_all().await.unwrap().unwrap();
    let ids: Vec<&str> = seasons.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "manual", "old"]);
    assert_eq!(seasons[1].created_at, 2_000);

    let queries = collection.list_queries.lock().unwrap().clone();
    let tokens: Vec<Option<&str>> = queries.iter().map(|q| q.get("pageToken").map(String::as_str)).collect();
    assert_eq!(tokens, vec![None, Some("1"), Some("2")]);
    assert!(queries.iter().all(|q| q.get("key").map(String::as_str) == Some("fs-key")));
    assert!(queries.iter().all(|q| q.contains_key("pageSize") && !q.contains_key("orderBy")));
}

#[tokio::test]
async fn test_firestore_writes_touch_single_documents() {
    let collection = Arc::new(Collection::default());
    let store = firestore_store(collection.clone()).await;

    let first = season("first", "Mare of Easttown", 1_000);
    let second = season("second", "The Leftovers", 2_000);
    let imported = vec![second.clone(), first.clone()];
    store.apply(Mutation::Insert(&imported), &imported).await.unwrap();

    let mut edited = first.clone();
    edited.review = "Better on rewatch".to_string();
    store.apply(Mutation::Upsert(&edited), &[second.clone(), edited.clone()]).await.unwrap();
    store.apply(Mutation::Remove("second"), std::slice::from_ref(&edited)).await.unwrap();

    let writes = collection.writes.lock().unwrap().clone();
    let expected: Vec<(String, String)> = [("PATCH", "second"), ("PATCH", "first"), ("PATCH", "first"), ("DELETE", "second")]
        .iter()
        .map(|(method, id)| (method.to_string(), id.to_string()))
        .collect();
    assert_eq!(writes, expected);
    assert_eq!(store.load_all().await.unwrap(), Some(vec![edited]));

    let missing = store.apply(Mutation::Remove("ghost"), &[]).await;
    assert!(matches!(missing, Err(Error::Remote { status: 404, .. })));
}

// ============================================================================
// Static data file behind a URL
// ============================================================================

#[tokio::test]
async fn test_static_url_source() {
    let router = Router::new()
        .route(
            "/seasons.json",
            get(|| async { r#"[{"title": "Reservation Dogs", "season": 3, "rating": 5, "createdAt": 1000}]"# }),
        )
        .route(
            "/broken.json",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream down") }),
        );
    let base = serve(router).await;
    let source = |path: &str| StaticFileSource::new(StaticLocation::Url(format!("{}{}", base, path))).unwrap();

    let seasons = source("/seasons.json").fetch().await.unwrap().unwrap();
    assert_eq!(seasons.len(), 1);
    assert_eq!(seasons[0].title, "Reservation Dogs");
    assert!(!seasons[0].id.is_empty());

    assert_eq!(source("/missing.json").fetch().await.unwrap(), None);
    assert!(matches!(
        source("/broken.json").fetch().await,
        Err(Error::Remote { status: 500, .. })
    ));
}

// ============================================================================
// Metadata enrichment
// ============================================================================

async fn tmdb_search(Query(params): Query<Params>) -> Response {
    if params.get("api_key").map(String::as_str) != Some("tmdb-key") {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "status_message": "Invalid API key" }))).into_response();
    }
    assert_eq!(params.get("language").map(String::as_str), Some("en-US"));
    let results = match params.get("query").map(String::as_str) {
        Some("The Bear") => json!([{ "id": 136315, "name": "The Bear" }]),
        _ => json!([]),
    };
    Json(json!({ "results": results })).into_response()
}

async fn tmdb_series(Path(id): Path<i64>) -> Json<Value> {
    assert_eq!(id, 136315);
    Json(json!({
        "networks": [{ "name": "FX" }],
        "genres": [{ "name": "Drama" }, { "name": "Comedy" }],
        "episode_run_time": [],
        "status": "Ended",
        "vote_average": 8.2
    }))
}

async fn tmdb_season(Path((id, number)): Path<(i64, u32)>) -> Json<Value> {
    assert_eq!((id, number), (136315, 2));
    Json(json!({
        "overview": "Carmy turns the sandwich shop into a restaurant.",
        "air_date": "2023-06-22",
        "episodes": [
            { "air_date": "2023-06-22", "runtime": 30 },
            { "air_date": "2023-06-22", "runtime": 40 },
            { "air_date": "2023-06-22", "runtime": 35 }
        ]
    }))
}

async fn tmdb_base() -> String {
    let router = Router::new()
        .route("/search/tv", get(tmdb_search))
        .route("/tv/:id", get(tmdb_series))
        .route("/tv/:id/season/:number", get(tmdb_season));
    serve(router).await
}

#[tokio::test]
async fn test_tmdb_search_then_series_then_season() {
    let base = tmdb_base().await;
    let enricher = build_enricher(&EnrichmentConfig {
        tmdb_api_key: Some("tmdb-key".to_string()),
        base_url: Some(format!("{}/", base)),
        ..Default::default()
    })
    .unwrap()
    .unwrap();
    assert_eq!(enricher.name(), "tmdb");

    let found = enricher.enrich("The Bear", 2).await.unwrap();
    assert_eq!(found.network.as_deref(), Some("FX"));
    assert_eq!(found.genres, vec!["Drama", "Comedy"]);
    assert_eq!(found.episodes, Some(3));
    assert_eq!(found.runtime, Some(35));
    assert_eq!(found.start_date, chrono::NaiveDate::from_ymd_opt(2023, 6, 22));
    assert_eq!(found.end_date, chrono::NaiveDate::from_ymd_opt(2023, 6, 22));
    assert_eq!(found.ongoing, Some(false));
    assert_eq!(found.ratings.tmdb, Some(8.2));
    assert_eq!(
        found.urls.tmdb.as_deref(),
        Some("https://www.themoviedb.org/tv/136315/season/2")
    );

    assert!(matches!(
        enricher.enrich("No Such Show", 1).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_tmdb_rejected_key_is_remote_error() {
    let base = tmdb_base().await;
    let enricher = build_enricher(&EnrichmentConfig {
        tmdb_api_key: Some("stale-key".to_string()),
        base_url: Some(base),
        ..Default::default()
    })
    .unwrap()
    .unwrap();

    assert!(matches!(
        enricher.enrich("The Bear", 2).await,
        Err(Error::Remote { status: 401, .. })
    ));
}

async fn gemini_generate(
    Path(call): Path<String>,
    Query(params): Query<Params>,
    Json(body): Json<Value>,
) -> Response {
    assert_eq!(params.get("key").map(String::as_str), Some("gemini-key"));
    if call != "gemini-2.5-flash:generateContent" {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": { "code": 429, "message": "Resource exhausted" } })),
        )
            .into_response();
    }
    assert!(body["tools"][0].get("google_search").is_some());
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("season 4") && prompt.contains("\"Slow Horses\""));

    let text = "Here is what I found:\n```json\n{\"network\": \"Apple TV+\", \"genres\": [\"Thriller\"], \
                \"episodes\": 6, \"runtime\": 48, \"startDate\": \"2024-09-04\", \"endDate\": \"2024-10-09\", \
                \"ongoing\": false, \"ratings\": {\"imdb\": 8.5, \"rottenTomatoes\": 100}, \
                \"urls\": {\"wikipedia\": \"https://en.wikipedia.org/wiki/Slow_Horses\"}}\n```";
    Json(json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }] },
            "groundingMetadata": {
                "groundingChunks": [
                    { "web": { "uri": "https://example.org/slow-horses", "title": "example.org" } },
                    { "web": null }
                ]
            }
        }]
    }))
    .into_response()
}

#[tokio::test]
async fn test_gemini_generate_content() {
    let base = serve(Router::new().route("/models/:call", post(gemini_generate))).await;
    let enricher = GeminiEnricher::new("gemini-key").unwrap().with_base_url(base.clone());

    let found = enricher.enrich("Slow Horses", 4).await.unwrap();
    assert_eq!(found.network.as_deref(), Some("Apple TV+"));
    assert_eq!(found.episodes, Some(6));
    assert_eq!(found.runtime, Some(48));
    assert_eq!(found.ongoing, Some(false));
    assert_eq!(found.ratings.imdb, Some(8.5));
    assert_eq!(found.ratings.rotten_tomatoes, Some(100.0));
    assert_eq!(
        found.urls.wikipedia.as_deref(),
        Some("https://en.wikipedia.org/wiki/Slow_Horses")
    );
    assert_eq!(found.sources.len(), 1);
    assert_eq!(found.sources[0].uri, "https://example.org/slow-horses");

    let busy = GeminiEnricher::new("gemini-key")
        .unwrap()
        .with_model("gemini-busy")
        .with_base_url(base);
    assert!(matches!(
        busy.enrich("Slow Horses", 4).await,
        Err(Error::Remote { status: 429, .. })
    ));
}
