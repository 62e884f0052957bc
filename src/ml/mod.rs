// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn model code. Only the data
// batcher and the checkpoint manager touch burn outside it.
//
//   model.rs      — The transformer encoder architecture
//                   • Token and positional embeddings
//                   • Multi-head self-attention, padding masked
//                   • Feed-forward networks (GELU activation)
//                   • Layer normalisation, residual connections
//                   • Prefix mean pooling of the last hidden states
//
//   inferencer.rs — The embedding extractor
//                   Loads a checkpoint, featurizes a batch of
//                   sentences, runs the encoder, returns one
//                   pooled vector per sentence
//
// Reference: Burn Book §3 (Building Blocks)
//            Vaswani et al. (2017) Attention Is All You Need

/// Transformer sentence encoder and pooling
pub mod model;

/// Batch inference producing pooled sentence embeddings
pub mod inferencer;
