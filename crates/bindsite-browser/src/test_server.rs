//! In-process stand-in for the structure service and the AlphaFold API.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

pub const PDB: &str = "\
ATOM      1  N   MET A   1     -10.123  12.000   3.500  1.00 12.50           N
ATOM      2  CA  MET A   1      -9.000  11.500   3.100  1.00 87.25           C
END
";
pub const VANILLA_PDB: &str = "\
ATOM      1  N   MET A   1     -10.123  12.000   3.500  1.00 70.00           N
END
";
pub const SIDE_CAR: &str =
    r#"[{"resid": 1, "restype": "MET", "pbind": 12.5}, {"resid": 2, "restype": "TYR", "pbind": 91.0}]"#;

/// `/search` echoes its parameters back in the first hit's description.
/// Identifiers under `/file/` pick the canned outcome:
///
/// - `P35367`: every artifact;
/// - `BROKEN`: 200 with a side-car that is not JSON;
/// - `FAIL`: 500;
/// - anything else: 404.
///
/// Only `P35367` has a prediction record; `EMPTY` has an empty array.
pub async fn spawn() -> String {
    let router = Router::new()
        .route("/search", get(search))
        .route("/file/{*path}", get(file))
        .route("/prediction/{id}", get(prediction));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Response {
    let q = params.get("q").cloned().unwrap_or_default();
    if q.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Query parameter is required."})),
        )
            .into_response();
    }
    let page = params.get("page").cloned().unwrap_or_else(|| "-".into());
    let limit = params.get("limit").cloned().unwrap_or_else(|| "-".into());
    Json(json!({
        "results": [
            {"pdbId": "P35367", "description": format!("q={q} page={page} limit={limit}"), "score": 0.01},
            {"pdbId": "P08172", "description": "Muscarinic acetylcholine receptor M2", "score": 0.2}
        ],
        "total": 7
    }))
    .into_response()
}

async fn file(Path(rest): Path<String>) -> Response {
    match rest.as_str() {
        "P35367/pdb" => PDB.into_response(),
        "P35367/pdb/vanilla" => VANILLA_PDB.into_response(),
        "P35367/json" => SIDE_CAR.into_response(),
        "BROKEN/json" => "not json".into_response(),
        "FAIL/pdb" | "FAIL/json" => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
        other => {
            let id = other.split('/').next().unwrap_or_default();
            (StatusCode::NOT_FOUND, format!("PDB file not found for {id}")).into_response()
        }
    }
}

async fn prediction(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "P35367" => Json(json!([{
            "entryId": "AF-P35367-F1",
            "uniprotDescription": "Histamine H1 receptor",
            "gene": "HRH1"
        }]))
        .into_response(),
        "EMPTY" => Json(json!([])).into_response(),
        _ => (StatusCode::NOT_FOUND, "{}").into_response(),
    }
}
