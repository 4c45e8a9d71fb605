use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("clause corpus not found: {}", .0.display())]
    CorpusNotFound(PathBuf),

    #[error("vector index not found: {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("{}:{line}: invalid clause record: {source}", .path.display())]
    InvalidRecord {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("duplicate clause id {id} at line {line}")]
    DuplicateId { id: u64, line: usize },

    #[error(
        "vector index holds {index} vectors but the corpus has {records} records; \
         rebuild the index to match the corpus"
    )]
    CountMismatch { index: usize, records: usize },

    #[error("index row {position} has id {index_id} but corpus record has id {record_id}")]
    IdMismatch {
        position: usize,
        index_id: i64,
        record_id: u64,
    },

    #[error("invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("malformed index artifact: {0}")]
    MalformedIndex(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}
