use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use bindsite_common::error::{IdentifierError, IndexError};
use bindsite_common::identifier::Identifier;
use bindsite_common::layout::ArtifactKind;
use bindsite_common::model::ErrorBody;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("Query parameter is required.")]
    MissingQuery,

    #[error("invalid query parameters: {0}")]
    BadQuery(String),

    #[error(transparent)]
    Index(IndexError),

    #[error("search task failed: {0}")]
    Task(String),

    #[error("invalid identifier: {0}")]
    Identifier(#[from] IdentifierError),

    #[error("Invalid file type requested")]
    InvalidFileType,

    #[error("Invalid file request")]
    InvalidFileRequest,

    #[error("{kind} file not found for {id}")]
    NotFound { kind: ArtifactKind, id: Identifier },

    #[error("failed to read {kind} file for {id}: {source}")]
    Artifact {
        kind: ArtifactKind,
        id: Identifier,
        #[source]
        source: std::io::Error,
    },
}

impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::InvalidQuery => Self::MissingQuery,
            other => Self::Index(other),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingQuery
            | Self::BadQuery(_)
            | Self::Identifier(_)
            | Self::InvalidFileType
            | Self::InvalidFileRequest => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Config(_) | Self::Index(_) | Self::Task(_) | Self::Artifact { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        match self {
            // Search failures answer in JSON, like successful searches.
            Self::MissingQuery | Self::BadQuery(_) => {
                (status, Json(ErrorBody { error: self.to_string() })).into_response()
            }
            Self::Index(_) | Self::Task(_) | Self::Config(_) => (
                status,
                Json(ErrorBody {
                    error: "Internal server error.".to_string(),
                }),
            )
                .into_response(),
            Self::Artifact { .. } => (status, "Internal server error").into_response(),
            _ => (status, self.to_string()).into_response(),
        }
    }
}
