// ============================================================
// Layer 3 — Embedding Matrix
// ============================================================
// A dense, row-major matrix of sentence embeddings.
// Row i is the pooled vector of input sentence i, so row order
// carries the alignment with the reference corpus.
//
// Storage is a single flat Vec<f32>:
//   [r0_c0, r0_c1, ..., r0_cD, r1_c0, ..., rN_cD]
// which is exactly the layout burn's into_data() hands back for
// a [batch, dim] tensor, so a batch output converts without
// copying element by element.
//
// Reference: Rust Book §8 (Vectors), §5 (Method Syntax)

use serde::{Deserialize, Serialize};

use crate::domain::error::EvalError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMatrix {
    rows: usize,
    dim:  usize,
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// An empty matrix of a known width, ready to be extended.
    pub fn empty(dim: usize) -> Self {
        Self { rows: 0, dim, data: Vec::new() }
    }

    /// Wrap a flat row-major buffer.
    pub fn from_flat(data: Vec<f32>, dim: usize) -> Result<Self, EvalError> {
        if dim == 0 || data.len() % dim != 0 {
            return Err(EvalError::BadShape { len: data.len(), dim });
        }
        Ok(Self { rows: data.len() / dim, dim, data })
    }

    /// Build from individual rows; every row must have the same width.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self, EvalError> {
        let dim = match rows.first() {
            Some(r) => r.len(),
            None    => return Err(EvalError::Empty),
        };
        let mut data = Vec::with_capacity(rows.len() * dim);
        for row in &rows {
            if row.len() != dim {
                return Err(EvalError::DimMismatch { expected: dim, actual: row.len() });
            }
            data.extend_from_slice(row);
        }
        Self::from_flat(data, dim)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dim)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Append all rows of `other` below the current rows, keeping order.
    pub fn extend(&mut self, other: &EmbeddingMatrix) -> Result<(), EvalError> {
        if other.dim != self.dim {
            return Err(EvalError::DimMismatch { expected: self.dim, actual: other.dim });
        }
        self.data.extend_from_slice(&other.data);
        self.rows += other.rows;
        Ok(())
    }
}
