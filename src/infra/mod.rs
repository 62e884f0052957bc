// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting pieces that the application layer wires up:
//
//   accumulator.rs     — Ordered, mutex-guarded collection of
//                        per-batch embeddings for one pass
//
//   checkpoint.rs      — Loading the pretrained encoder
//                        (config JSON + CompactRecorder weights)
//
//   tokenizer_store.rs — Loading the encoder's tokenizer.json
//
//   metrics.rs         — Results logging: one CSV row per run
//                        plus a JSON report of the last run
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §16 (Fearless Concurrency)
//            Burn Book §5 (Checkpointing)

/// Order-preserving accumulation target for encoder passes
pub mod accumulator;

/// Pretrained encoder loading
pub mod checkpoint;

/// Tokenizer loading
pub mod tokenizer_store;

/// Evaluation results logger
pub mod metrics;
