use std::io;

use thiserror::Error;

use crate::core::types::RecordIndex;

/// Error type for ledger operations, term lookups, and persistence failures.
#[derive(Debug, Error)]
pub enum AnnotatorError {
    #[error("invalid index {index}: ledger holds {len} records")]
    OutOfRange { index: RecordIndex, len: usize },
    #[error("record {index} already answered")]
    AlreadyAnswered { index: RecordIndex },
    #[error("empty answer for record {index}")]
    EmptyAnswer { index: RecordIndex },
    #[error("every record has been answered")]
    NothingToDo,
    #[error("term {term:?} not found")]
    NotFound { term: String },
    #[error("ledger was opened without a term index")]
    TermIndexDisabled,
    #[error("malformed entry {entry} at line {line}, column {column}: {source}")]
    Decode {
        entry: usize,
        line: usize,
        column: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode record {index}: {source}")]
    Encode {
        index: RecordIndex,
        #[source]
        source: serde_json::Error,
    },
    #[error("record {index}: candidate {candidate:?} has non-finite distance {distance}")]
    NonFiniteDistance {
        index: RecordIndex,
        candidate: String,
        distance: f64,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T, E = AnnotatorError> = std::result::Result<T, E>;
