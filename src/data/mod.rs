// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the corpus files on disk and the tensors
// the encoder consumes:
//
//   mkb.en / mkb.<lang>
//       │
//       ▼
//   MkbLoader         → reads one sentence per line
//       │
//       ▼
//   Preprocessor      → normalises whitespace and control chars
//       │
//       ▼
//   Featurizer        → [CLS] tokens [SEP] + padding, attention mask
//       │
//       ▼
//   SentenceBatcher   → stacks samples into [batch, seq] tensors
//
// No step reorders, merges, or drops sentences.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Loads the parallel corpus files
pub mod loader;

/// Cleans one corpus line
pub mod preprocessor;

/// Tokenises, truncates and pads sentences
pub mod features;

/// Implements Burn's Batcher trait for sentence samples
pub mod batcher;
