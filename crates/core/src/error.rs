use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("cannot reach {service} at {endpoint}: {source}")]
    Unreachable {
        service: &'static str,
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("model {model:?} is not known to {service}; pull it or select another model")]
    UnknownModel {
        service: &'static str,
        model: String,
    },

    #[error("{service} returned {status}: {body}")]
    Backend {
        service: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("invalid response from {service}: {details}")]
    Response {
        service: &'static str,
        details: String,
    },

    #[error("provider misconfigured: {0}")]
    Configuration(String),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed index file: {0}")]
    BadHeader(String),

    #[error("vector dimension {got} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("row {row} has dimension {got}, expected {expected}")]
    NonUniformRows {
        row: usize,
        expected: usize,
        got: usize,
    },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    Pdf(String),

    #[error("docx parse error: {0}")]
    Docx(String),

    #[error("no documents found in {dir}; add .txt, .md, .pdf, or .docx files and retry")]
    NoDocuments { dir: PathBuf },

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("embedding failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("index build failed: {0}")]
    Index(#[from] IndexError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("index not found in {dir}; build the index first")]
    IndexNotFound { dir: PathBuf },

    #[error("corrupt index: {details}")]
    CorruptIndex { details: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("search failed: {0}")]
    Index(#[from] IndexError),

    #[error("deserialize error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
