// ============================================================
// Layer 3 — Domain Errors
// ============================================================
// Typed failures raised by the pure layers (domain, scoring,
// accumulation). The application and CLI layers wrap these in
// anyhow::Error with extra context, so every variant carries
// enough detail to be read on its own.
//
// Reference: thiserror crate documentation
//            Rust Book §9 (Recoverable Errors with Result)

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// A corpus identifier other than `en` or `in` was requested.
    #[error("invalid corpus mode '{0}': expected 'en' or 'in'")]
    InvalidMode(String),

    /// The two matrices (or corpora) being compared differ in row count.
    #[error("row count mismatch: {left} rows vs {right} rows")]
    RowMismatch { left: usize, right: usize },

    /// Rows of differing width were mixed into one matrix.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimMismatch { expected: usize, actual: usize },

    /// A flat buffer could not be shaped into `rows × dim`.
    #[error("buffer of {len} values cannot form a matrix of width {dim}")]
    BadShape { len: usize, dim: usize },

    #[error("cannot score an empty embedding matrix")]
    Empty,

    /// An embedding holds NaN or infinity; every distance to it is meaningless.
    #[error("{side} embeddings contain a non-finite value in row {row}")]
    NonFinite { side: &'static str, row: usize },

    #[error("top-k must be at least 1")]
    InvalidTopK,

    /// The same batch index was appended twice within one pass.
    #[error("batch {0} was already appended in this pass")]
    DuplicateBatch(usize),

    /// Drain found a hole in the batch sequence.
    #[error("batch {0} is missing from the accumulated pass")]
    MissingBatch(usize),

    /// Another appender panicked while holding the accumulator lock.
    #[error("accumulator lock is poisoned; refusing to append or drain")]
    LockPoisoned,

    #[error("alignment needs 1..{rows} fitting rows, got {requested}")]
    InvalidAlignmentRows { requested: usize, rows: usize },

    #[error("linear alignment system is singular")]
    SingularSystem,
}
