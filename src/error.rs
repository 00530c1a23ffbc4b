use std::io;
use thiserror::Error;

use crate::shared::ElementType;

/// Errors surfaced by the key recovery engine.
///
/// Degenerate statistics (an empty DPA partition, a zero-variance sample
/// column) are not errors; scoring treats them as zero.
#[derive(Debug, Error)]
pub enum Error {
    #[error("trace matrix has {traces} rows but plaintext matrix has {plaintexts}")]
    RowCountMismatch { traces: usize, plaintexts: usize },
    #[error("attack requires at least one trace")]
    EmptyTraceSet,
    #[error("plaintext matrix must have {expected} columns, got {actual}")]
    PlaintextWidth { expected: usize, actual: usize },
    #[error("buffer of {len} elements cannot be viewed as a {rows}x{cols} matrix")]
    ShapeMismatch { rows: usize, cols: usize, len: usize },
    #[error("shared buffer holds {actual:?} elements but its descriptor declares {declared:?}")]
    ElementTypeMismatch {
        declared: ElementType,
        actual: ElementType,
    },
    #[error("key guess must hold {expected} byte results, got {actual}")]
    KeyGuessLength { expected: usize, actual: usize },
    #[error("failed to save/load attack results")]
    SaveLoad(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
