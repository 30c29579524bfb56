//! Client for the public AlphaFold prediction metadata API.
//!
//! `GET <base>/prediction/<id>` returns an array of prediction records; the
//! first record describes the model whose files the backend serves.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::identifier::Identifier;

pub const DEFAULT_ALPHAFOLD_URL: &str = "https://alphafold.ebi.ac.uk/api";
const MAX_ERROR_BODY_BYTES: usize = 8 * 1024;

#[derive(Clone, Debug)]
pub struct AlphaFoldConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_error_body_bytes: usize,
}

impl AlphaFoldConfig {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            max_error_body_bytes: MAX_ERROR_BODY_BYTES,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AlphaFoldError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("no prediction found for {0}")]
    NotFound(String),

    #[error("alphafold returned error: status={status} body={body}")]
    Upstream { status: StatusCode, body: String },
}

/// The fields of a prediction record this system displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureMetadata {
    pub entry_id: String,
    #[serde(default)]
    pub uniprot_accession: Option<String>,
    #[serde(default)]
    pub uniprot_id: Option<String>,
    #[serde(default)]
    pub uniprot_description: Option<String>,
    #[serde(default)]
    pub gene: Option<String>,
    #[serde(default)]
    pub organism_scientific_name: Option<String>,
    #[serde(default)]
    pub latest_version: Option<u32>,
    #[serde(default)]
    pub pdb_url: Option<String>,
}

#[derive(Clone)]
pub struct AlphaFoldClient {
    config: AlphaFoldConfig,
    http: reqwest::Client,
}

impl AlphaFoldClient {
    pub fn new(config: AlphaFoldConfig) -> Result<Self, AlphaFoldError> {
        let http = reqwest::Client::builder()
            .user_agent("bindsite/alphafold")
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &AlphaFoldConfig {
        &self.config
    }

    pub fn prediction_url(&self, id: &Identifier) -> String {
        format!("{}/prediction/{id}", self.config.base_url)
    }

    pub async fn prediction(&self, id: &Identifier) -> Result<StructureMetadata, AlphaFoldError> {
        let url = self.prediction_url(id);
        debug!(%url, "fetching prediction metadata");
        let resp = self.http.get(&url).send().await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AlphaFoldError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            let body = read_limited_text(resp, self.config.max_error_body_bytes).await;
            return Err(AlphaFoldError::Upstream { status, body });
        }

        let records = resp.json::<Vec<StructureMetadata>>().await?;
        first_prediction(records, id)
    }
}

fn first_prediction(
    records: Vec<StructureMetadata>,
    id: &Identifier,
) -> Result<StructureMetadata, AlphaFoldError> {
    records
        .into_iter()
        .next()
        .ok_or_else(|| AlphaFoldError::NotFound(id.to_string()))
}

/// Read at most `max_bytes` of an error body for diagnostics.
pub async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read upstream error body");
            "<failed to read error body>".to_string()
        }
    }
}
