// ============================================================
// Layer 3 — Sentence Corpus Domain Types
// ============================================================
// A parallel corpus is two ordered lists of sentences where
// line i of one side is the translation of line i of the other.
// No ids travel with the sentences: position IS the identity,
// so nothing in the pipeline may reorder or drop a line.
//
// CorpusMode picks which side of the pair a pass encodes.
// It is resolved once when parsed (from "en" / "in") and then
// matched exhaustively, so an unknown side can never reach the
// loader.
//
// Reference: Rust Book §6 (Enums and Pattern Matching)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::EvalError;

/// Which side of the parallel corpus a pass works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorpusMode {
    /// The English reference side (`en`).
    English,
    /// The Indic-language side (`in`), language chosen by `--lang`.
    Indic,
}

impl CorpusMode {
    /// The short identifier used on the command line and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            CorpusMode::English => "en",
            CorpusMode::Indic   => "in",
        }
    }
}

impl fmt::Display for CorpusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorpusMode {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(CorpusMode::English),
            "in" => Ok(CorpusMode::Indic),
            other => Err(EvalError::InvalidMode(other.to_string())),
        }
    }
}

/// One side of a parallel corpus, in file order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceCorpus {
    pub mode:      CorpusMode,
    pub sentences: Vec<String>,
}

impl SentenceCorpus {
    pub fn new(mode: CorpusMode, sentences: Vec<String>) -> Self {
        Self { mode, sentences }
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }
}

/// Check that two corpus sides can be compared row by row.
///
/// Alignment is positional, so a length difference means the
/// files are out of step and any score would be meaningless.
pub fn ensure_aligned(a: &SentenceCorpus, b: &SentenceCorpus) -> Result<(), EvalError> {
    if a.len() != b.len() {
        return Err(EvalError::RowMismatch { left: a.len(), right: b.len() });
    }
    Ok(())
}
