//! Error types for each stage of the update pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::SectionKey;

/// Errors raised while building the updater configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("bad target url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),
}

/// Errors from the single upstream request. These never leave the fetcher;
/// they are folded into [`crate::types::RawContent::Unavailable`].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http status {0}")]
    Status(u16),

    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Errors a section deriver can report for its own section.
#[derive(Debug, Error)]
pub enum DeriveError {
    #[error("no source block for section {key} on the page")]
    MissingSection { key: SectionKey },

    #[error("malformed source block for section {key}: {source}")]
    Malformed {
        key: SectionKey,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid selector for section {key}: {message}")]
    Selector { key: SectionKey, message: String },

    #[error("duplicate id {id} in section {key}")]
    DuplicateId { key: SectionKey, id: u32 },

    #[error("zero denominator computing ratio for item {id} in section {key}")]
    ZeroDenominator { key: SectionKey, id: u32 },

    #[error("integer overflow computing item {id} in section {key}")]
    Overflow { key: SectionKey, id: u32 },

    #[error("percentage {0} outside 0..=100")]
    PercentOutOfRange(i64),

    #[error("failed to encode section {key}: {source}")]
    Encode {
        key: SectionKey,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from reading or writing the data document.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt data file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("data file {path} is not a JSON object")]
    NotAnObject { path: PathBuf },

    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write temporary file next to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to move new document into place at {path}: {source}")]
    Commit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The only condition that fails a run as a whole.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("failed to persist data document: {0}")]
    Persist(#[from] StoreError),
}
