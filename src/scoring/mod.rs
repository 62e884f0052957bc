// ============================================================
// Layer 7 — Retrieval Scoring
// ============================================================
// Pure numeric code: no Burn, no files, no threads.
// Everything here takes EmbeddingMatrix values from the domain
// layer and returns plain numbers, so it is tested exhaustively
// on synthetic vectors.
//
//   accuracy.rs  — mean-centring, cosine distance, accuracy@k
//   alignment.rs — optional least-squares map from A to B
//   dense.rs     — the f64 working matrix both of them share

pub mod accuracy;

pub mod alignment;

pub mod dense;
