use serde::Serialize;
use thiserror::Error;

/// Failures that stop an operation as a whole.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    FetchStatus { url: String, status: u16 },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("record not found: {0}")]
    NotFound(i64),
    #[error("note not found: {0}")]
    NoteNotFound(i64),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A problem confined to one candidate of a scrape run. Collected into the
/// run report instead of aborting the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordError {
    #[error("candidate #{index}: missing `{field}`")]
    Extraction { index: usize, field: String },
    #[error("failed to persist \"{title}\" ({link}): {reason}")]
    Persistence {
        title: String,
        link: String,
        reason: String,
    },
}
