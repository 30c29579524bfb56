//! Error types shared across the bindsite crates. The server maps them to
//! status codes; the browser shows them inline.

#[derive(Debug, thiserror::Error)]
pub enum IdentifierError {
    #[error("identifier is empty")]
    Empty,

    #[error("identifier is longer than {max} characters")]
    TooLong { max: usize },

    #[error("identifier contains invalid character {0:?}")]
    InvalidChar(char),
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("failed to read description index {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed description index: {0}")]
    Malformed(String),

    #[error("query must not be empty")]
    InvalidQuery,
}
