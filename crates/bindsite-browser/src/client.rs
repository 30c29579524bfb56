use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use bindsite_common::alphafold::read_limited_text;
use bindsite_common::identifier::Identifier;
use bindsite_common::layout::ArtifactKind;
use bindsite_common::model::{ResidueAnnotation, SearchResponse};

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5002";
const MAX_ERROR_BODY_BYTES: usize = 8 * 1024;

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_error_body_bytes: usize,
}

impl BackendConfig {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            max_error_body_bytes: MAX_ERROR_BODY_BYTES,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend returned error: status={status} body={body}")]
    Upstream { status: StatusCode, body: String },
}

/// Client for the structure service's search and file routes.
///
/// Requests are issued once; failures surface directly to the caller.
#[derive(Clone)]
pub struct BackendClient {
    config: BackendConfig,
    http: reqwest::Client,
}

impl BackendClient {
    pub fn new(config: BackendConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent("bindsite/browser")
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, http })
    }

    pub fn search_url(&self) -> String {
        format!("{}/search", self.config.base_url)
    }

    pub fn file_url(&self, id: &Identifier, kind: ArtifactKind) -> String {
        format!("{}/file/{id}/{}", self.config.base_url, kind.route())
    }

    pub async fn search(
        &self,
        query: &str,
        page: Option<usize>,
        limit: Option<usize>,
    ) -> Result<SearchResponse, ClientError> {
        let mut params: Vec<(&str, String)> = vec![("q", query.to_string())];
        if let Some(page) = page {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }

        let resp = self.http.get(self.search_url()).query(&params).send().await?;
        let body = self.success_body(resp).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Structure text for the processed or raw variant.
    pub async fn structure(
        &self,
        id: &Identifier,
        kind: ArtifactKind,
    ) -> Result<String, ClientError> {
        self.fetch_text(id, kind).await
    }

    pub async fn annotations(&self, id: &Identifier) -> Result<Vec<ResidueAnnotation>, ClientError> {
        self.fetch_json(id, ArtifactKind::ResidueAnnotations).await
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        id: &Identifier,
        kind: ArtifactKind,
    ) -> Result<T, ClientError> {
        let body = self.fetch_text(id, kind).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn fetch_text(&self, id: &Identifier, kind: ArtifactKind) -> Result<String, ClientError> {
        let url = self.file_url(id, kind);
        debug!(%url, "fetching artifact");
        let resp = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, kind.content_type())
            .send()
            .await?;
        self.success_body(resp).await
    }

    async fn success_body(&self, resp: reqwest::Response) -> Result<String, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.text().await?);
        }
        let body = read_limited_text(resp, self.config.max_error_body_bytes).await;
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(body));
        }
        Err(ClientError::Upstream { status, body })
    }
}
