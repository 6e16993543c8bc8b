use crate::models::BackendKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("bad endpoint url: {0}")]
    BadEndpoint(#[from] url::ParseError),

    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("chunk store rejected replace: {0}")]
    Store(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("{backend} backend unavailable: {reason}")]
    BackendUnavailable {
        backend: BackendKind,
        reason: String,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("search request failed: {0}")]
    Request(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
