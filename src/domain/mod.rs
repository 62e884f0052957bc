// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe the evaluation:
// corpora, embedding matrices, the typed errors, and the
// traits the other layers implement.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// Corpus sides and the parallel sentence lists
pub mod corpus;

/// Row-major matrix of pooled sentence embeddings
pub mod embedding;

/// Typed errors for the pure layers
pub mod error;

/// CorpusSource and BatchEncoder abstractions
pub mod traits;
