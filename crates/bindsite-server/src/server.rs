//! HTTP surface of the structure service.
//!
//! # Endpoints
//!
//! - `GET /search?q=&limit=&page=` - fuzzy search over the description index
//! - `GET /file/{id}/pdb` - processed structure
//! - `GET /file/{id}/pdb/vanilla` - raw structure
//! - `GET /file/{id}/json` - per-residue annotations
//! - `GET /health` - liveness plus index status

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::HeaderMap,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use bindsite_common::index::DescriptionIndex;
use bindsite_common::layout::ArtifactLayout;
use bindsite_common::model::{SearchRequest, SearchResponse};

use crate::config::Config;
use crate::error::AppError;
use crate::files::{artifact_response, parse_file_path, read_artifact};

/// Longer queries are rejected; matching cost grows with pattern length.
pub const MAX_QUERY_CHARS: usize = 256;

/// Immutable per-process state; every request reads its own files.
pub struct AppState {
    pub config: Config,
    pub layout: ArtifactLayout,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let layout = ArtifactLayout::new(config.pred_dir.clone());
        Self { config, layout }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub index_present: bool,
    pub structures_root_present: bool,
}

/// Empty values count as absent; anything else must be a non-negative integer.
fn parse_count(name: &str, raw: Option<&str>) -> Result<Option<usize>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<usize>()
            .map(Some)
            .map_err(|_| AppError::BadQuery(format!("{name} must be a non-negative integer"))),
    }
}

/// GET /search
async fn search(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Query(params) = params.map_err(|e| AppError::BadQuery(e.body_text()))?;

    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(AppError::MissingQuery);
    }
    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(AppError::BadQuery(format!(
            "q must be at most {MAX_QUERY_CHARS} characters"
        )));
    }
    let limit = parse_count("limit", params.limit.as_deref())?;
    let page = parse_count("page", params.page.as_deref())?;
    let request = SearchRequest::new(query, page, limit, state.config.search_max_limit);

    let index = DescriptionIndex::load(&state.config.index_path).await?;
    let options = state.config.match_options();
    let (request, response) = tokio::task::spawn_blocking(move || {
        let response = index.search(&request, options);
        (request, response)
    })
    .await
    .map_err(|e| AppError::Task(e.to_string()))?;
    let response = response?;

    info!(
        query = %request.query,
        page = request.page,
        limit = request.limit,
        returned = response.results.len(),
        total = response.total,
        "search served"
    );
    Ok(Json(response))
}

/// GET /file/{*path}
async fn file(
    State(state): State<Arc<AppState>>,
    Path(rest): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (id, kind) = parse_file_path(&rest).inspect_err(|e| {
        warn!(path = %rest, error = %e, "rejected file request");
    })?;
    let artifact = read_artifact(&state.layout, &id, kind).await?;
    Ok(artifact_response(
        artifact,
        &headers,
        state.config.artifact_max_age_secs,
    ))
}

/// GET /health
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let index_present = tokio::fs::metadata(&state.config.index_path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    let structures_root_present = tokio::fs::metadata(state.layout.root())
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    let status = if index_present && structures_root_present {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        index_present,
        structures_root_present,
    })
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/search", get(search))
        .route("/file/{*path}", get(file))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(listen_addr = %addr, "structure server ready");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("structure server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH, ORIGIN};
    use axum::http::{Request, StatusCode};
    use bindsite_common::model::ErrorBody;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const PDB: &str = "ATOM      1  N   MET A   1     -10.123  12.000   3.500  1.00 87.50           N\nEND\n";
    const VANILLA: &str = "ATOM      1  N   MET A   1     -10.123  12.000   3.500  1.00 91.02           N\nEND\n";
    const SIDE_CAR: &str = r#"[{"resid": 1, "restype": "MET", "pbind": 87.5}]"#;

    struct Fixture {
        dir: TempDir,
        router: Router,
    }

    fn fixture_with_index(index_json: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let preds = dir.path().join("preds");
        let model = preds.join("AF-P35367-F1-model_v4");
        std::fs::create_dir_all(&model).unwrap();
        std::fs::write(model.join("AF-P35367.pdb"), PDB).unwrap();
        std::fs::write(model.join("AF-P35367_vanilla.pdb"), VANILLA).unwrap();
        std::fs::write(model.join("AF-P35367.json"), SIDE_CAR).unwrap();

        let index_path = dir.path().join("pdbid_uniprot_descriptions.json");
        std::fs::write(&index_path, index_json).unwrap();

        let config = Config::for_paths(&preds, &index_path);
        let router = create_router(Arc::new(AppState::new(config)));
        Fixture { dir, router }
    }

    fn fixture() -> Fixture {
        let mut entries = serde_json::Map::new();
        entries.insert("P35367".into(), "Histamine H1 receptor".into());
        entries.insert("P08172".into(), "Muscarinic acetylcholine receptor M2".into());
        for i in 0..12 {
            entries.insert(format!("R{i:04}"), format!("Receptor subtype {i}").into());
        }
        fixture_with_index(&serde_json::Value::Object(entries).to_string())
    }

    async fn get(router: &Router, uri: &str) -> axum::response::Response {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        router.clone().oneshot(request).await.unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn search_json(router: &Router, uri: &str) -> SearchResponse {
        let response = get(router, uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    #[tokio::test]
    async fn search_finds_histamine_receptor() {
        let f = fixture();
        let resp = search_json(&f.router, "/search?q=histamine").await;
        let hit = resp
            .results
            .iter()
            .find(|h| h.pdb_id == "P35367")
            .expect("P35367 in results");
        assert_eq!(hit.description, "Histamine H1 receptor");
    }

    #[tokio::test]
    async fn search_wire_format_uses_pdb_id_key() {
        let f = fixture();
        let response = get(&f.router, "/search?q=histamine").await;
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["results"][0]["pdbId"], "P35367");
        assert!(json["total"].is_u64());
    }

    #[tokio::test]
    async fn search_pages_respect_limit_and_do_not_overlap() {
        let f = fixture();
        let first = search_json(&f.router, "/search?q=receptor%20subtype&limit=5&page=1").await;
        let second = search_json(&f.router, "/search?q=receptor%20subtype&limit=5&page=2").await;

        assert!(first.results.len() <= 5);
        assert!(second.results.len() <= 5);
        assert!(!second.results.is_empty());
        for hit in &second.results {
            assert!(first.results.iter().all(|h| h.pdb_id != hit.pdb_id));
        }
    }

    #[tokio::test]
    async fn search_defaults_to_five_results() {
        let f = fixture();
        let resp = search_json(&f.router, "/search?q=receptor%20subtype").await;
        assert_eq!(resp.results.len(), 5);
        assert!(resp.total >= 12);
    }

    #[tokio::test]
    async fn missing_or_blank_query_is_a_client_error() {
        let f = fixture();
        for uri in ["/search", "/search?q=", "/search?q=%20%20", "/search?limit=5"] {
            let response = get(&f.router, uri).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            let body: ErrorBody = serde_json::from_str(&body_text(response).await).unwrap();
            assert_eq!(body.error, "Query parameter is required.");
        }
    }

    #[tokio::test]
    async fn non_numeric_paging_is_a_client_error() {
        let f = fixture();
        let response = get(&f.router, "/search?q=histamine&limit=abc").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = get(&f.router, "/search?q=histamine&page=-1").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn overlong_query_is_rejected_before_matching() {
        let f = fixture();
        let at_limit = "a".repeat(MAX_QUERY_CHARS);
        let response = get(&f.router, &format!("/search?q={at_limit}")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let junk = "xq".repeat(1050);
        let response = get(&f.router, &format!("/search?q={junk}")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(body.error.contains("256"));
    }

    #[tokio::test]
    async fn corrupt_index_is_a_server_error() {
        let f = fixture_with_index("{ this is not json");
        let response = get(&f.router, "/search?q=histamine").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body.error, "Internal server error.");

        // File routes do not depend on the index.
        let response = get(&f.router, "/file/P35367/pdb").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn serves_each_artifact_with_its_content_type() {
        let f = fixture();
        for (uri, content_type, expected) in [
            ("/file/P35367/pdb", "text/plain", PDB),
            ("/file/P35367/pdb/vanilla", "text/plain", VANILLA),
            ("/file/P35367/json", "application/json", SIDE_CAR),
        ] {
            let response = get(&f.router, uri).await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            assert_eq!(response.headers()[CONTENT_TYPE], content_type);
            assert!(response.headers()[CACHE_CONTROL]
                .to_str()
                .unwrap()
                .contains("immutable"));
            assert!(response.headers().contains_key(ETAG));
            assert_eq!(body_text(response).await, expected);
        }
    }

    #[tokio::test]
    async fn absent_identifier_is_not_found_for_every_kind() {
        let f = fixture();
        for uri in [
            "/file/Q99999/pdb",
            "/file/Q99999/pdb/vanilla",
            "/file/Q99999/json",
        ] {
            let response = get(&f.router, uri).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn missing_vanilla_file_has_descriptive_body() {
        let f = fixture();
        let dir = f.dir.path().join("preds/AF-P35367-F1-model_v4");
        std::fs::remove_file(dir.join("AF-P35367_vanilla.pdb")).unwrap();

        let response = get(&f.router, "/file/P35367/pdb/vanilla").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_text(response).await,
            "vanilla PDB file not found for P35367"
        );
    }

    #[tokio::test]
    async fn path_traversal_is_rejected() {
        let f = fixture();
        for uri in [
            "/file/../../etc/passwd/pdb",
            "/file/..%2F..%2Fetc%2Fpasswd/pdb",
            "/file/..%2Fpreds/json",
            "/file/P35367%00/pdb",
        ] {
            let response = get(&f.router, uri).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn unknown_artifact_type_is_rejected() {
        let f = fixture();
        let response = get(&f.router, "/file/P35367/xml").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Invalid file type requested");
    }

    #[tokio::test]
    async fn matching_etag_returns_not_modified() {
        let f = fixture();
        let first = get(&f.router, "/file/P35367/pdb").await;
        let etag = first.headers()[ETAG].clone();

        let request = Request::builder()
            .uri("/file/P35367/pdb")
            .header(IF_NONE_MATCH, etag)
            .body(Body::empty())
            .unwrap();
        let response = f.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let f = fixture();
        let request = Request::builder()
            .uri("/search?q=histamine")
            .header(ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let response = f.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn health_reports_ok_when_files_are_present() {
        let f = fixture();
        let response = get(&f.router, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        let health: HealthResponse = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(health.status, "ok");
        assert!(health.index_present);
        assert!(health.structures_root_present);
    }

    #[tokio::test]
    async fn health_degrades_when_index_is_missing() {
        let f = fixture();
        std::fs::remove_file(f.dir.path().join("pdbid_uniprot_descriptions.json")).unwrap();
        let response = get(&f.router, "/health").await;
        let health: HealthResponse = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(health.status, "degraded");
        assert!(!health.index_present);
        assert!(health.structures_root_present);
    }

    #[tokio::test]
    async fn health_does_not_parse_the_index() {
        let f = fixture_with_index("{ this is not json");
        let response = get(&f.router, "/health").await;
        let health: HealthResponse = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(health.status, "ok");
    }
}
