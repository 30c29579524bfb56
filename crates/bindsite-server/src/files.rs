use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use bindsite_common::identifier::Identifier;
use bindsite_common::layout::{ArtifactKind, ArtifactLayout};

use crate::error::AppError;

/// Split the path after `/file/` into an identifier and artifact kind.
///
/// Accepted shapes: `<id>/pdb`, `<id>/pdb/vanilla`, `<id>/json`.
pub fn parse_file_path(rest: &str) -> Result<(Identifier, ArtifactKind), AppError> {
    let segments: Vec<&str> = rest.split('/').collect();
    let (id, kind) = match segments.as_slice() {
        [id, "pdb"] => (*id, ArtifactKind::ProcessedStructure),
        [id, "pdb", "vanilla"] => (*id, ArtifactKind::RawStructure),
        [id, "json"] => (*id, ArtifactKind::ResidueAnnotations),
        [_, _] => return Err(AppError::InvalidFileType),
        _ => return Err(AppError::InvalidFileRequest),
    };
    Ok((Identifier::parse(id)?, kind))
}

#[derive(Debug)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub body: Vec<u8>,
    pub etag: String,
}

/// Read the whole artifact into memory.
pub async fn read_artifact(
    layout: &ArtifactLayout,
    id: &Identifier,
    kind: ArtifactKind,
) -> Result<Artifact, AppError> {
    let path = layout.path_for(id, kind);
    info!(pdb_id = %id, kind = %kind, path = %path.display(), "serving artifact");

    match tokio::fs::read(&path).await {
        Ok(body) => Ok(Artifact {
            kind,
            etag: etag_for(&body),
            body,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(pdb_id = %id, kind = %kind, "artifact not found");
            Err(AppError::NotFound {
                kind,
                id: id.clone(),
            })
        }
        Err(source) => Err(AppError::Artifact {
            kind,
            id: id.clone(),
            source,
        }),
    }
}

/// Strong validator: hex SHA-256 of the body, quoted.
pub fn etag_for(body: &[u8]) -> String {
    format!("\"{:x}\"", Sha256::digest(body))
}

fn etag_matches(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(IF_NONE_MATCH)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|tag| tag.trim())
        .any(|tag| tag == "*" || tag.trim_start_matches("W/") == etag)
}

/// Build the response, answering 304 when the client already holds this body.
pub fn artifact_response(
    artifact: Artifact,
    request_headers: &HeaderMap,
    max_age_secs: u64,
) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(artifact.kind.content_type()),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={max_age_secs}, immutable")) {
        headers.insert(CACHE_CONTROL, value);
    }
    if let Ok(value) = HeaderValue::from_str(&artifact.etag) {
        headers.insert(ETAG, value);
    }

    if etag_matches(request_headers, &artifact.etag) {
        return (StatusCode::NOT_MODIFIED, headers).into_response();
    }
    (StatusCode::OK, headers, Body::from(artifact.body)).into_response()
}
