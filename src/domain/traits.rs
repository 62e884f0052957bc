// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The two seams of the evaluation pipeline:
//
//   CorpusSource  — where the parallel sentences come from
//                   (MkbLoader reads them from text files)
//
//   BatchEncoder  — turns one batch of sentences into one
//                   pooled vector per sentence
//                   (EmbeddingExtractor runs the burn model)
//
// The encoder pass only sees BatchEncoder, so its ordering and
// accumulation rules can be tested with a fake encoder that
// needs no GPU and no checkpoint.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::corpus::{CorpusMode, SentenceCorpus};
use crate::domain::embedding::EmbeddingMatrix;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can load one side of a parallel corpus.
pub trait CorpusSource {
    /// Load every sentence of the requested side, in file order.
    fn load(&self, mode: CorpusMode) -> Result<SentenceCorpus>;
}

// ─── BatchEncoder ─────────────────────────────────────────────────────────────
/// Any component that embeds a batch of sentences.
///
/// Implementations must return exactly one row per input sentence,
/// in input order.
pub trait BatchEncoder {
    fn encode_batch(&self, sentences: &[String]) -> Result<EmbeddingMatrix>;
}
