// ============================================================
// Layer 6 — Embedding Accumulator
// ============================================================
// Collects the per-batch outputs of one encoder pass into a
// single ordered matrix.
//
// Lifecycle of one pass:
//   reset(mode)          → discard anything left over, start fresh
//   append(i, batch)     → store batch i (any thread, any order)
//   drain()              → concatenate batches 0..k in index order,
//                          return the matrix, leave the target empty
//
// Ordering:
//   Batches are keyed by their submission index, not by the order
//   in which their appends happen to win the lock. Workers may
//   finish out of order; drain still stitches rows back together
//   in the order the sentences were handed out.
//
// Mutual exclusion:
//   One std::sync::Mutex guards the whole state. Every append and
//   drain holds the guard for its full duration and the guard is
//   released on every exit path, including early error returns.
//   A drain therefore never sees half an append. If a thread
//   panicked while holding the guard the mutex is poisoned and
//   every later call fails with LockPoisoned instead of writing
//   into state of unknown shape.
//
// Reference: Rust Book §16 (Shared-State Concurrency)

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::corpus::CorpusMode;
use crate::domain::embedding::EmbeddingMatrix;
use crate::domain::error::EvalError;

#[derive(Debug, Default)]
struct PassState {
    mode:    Option<CorpusMode>,
    dim:     Option<usize>,
    batches: BTreeMap<usize, EmbeddingMatrix>,
}

impl PassState {
    fn rows(&self) -> usize {
        self.batches.values().map(EmbeddingMatrix::rows).sum()
    }
}

/// Shared, order-preserving accumulation target for one encoder pass.
#[derive(Debug, Default)]
pub struct EmbeddingAccumulator {
    state: Mutex<PassState>,
}

impl EmbeddingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, PassState>, EvalError> {
        self.state.lock().map_err(|_| EvalError::LockPoisoned)
    }

    /// Start a new pass, dropping any content a previous pass left behind.
    pub fn reset(&self, mode: CorpusMode) -> Result<(), EvalError> {
        let mut state = self.lock()?;
        if !state.batches.is_empty() {
            tracing::warn!(
                "Discarding {} stale rows from an unfinished '{}' pass",
                state.rows(),
                state.mode.map(|m| m.as_str()).unwrap_or("?"),
            );
        }
        *state = PassState { mode: Some(mode), ..PassState::default() };
        tracing::debug!("Accumulator reset for '{}' pass", mode);
        Ok(())
    }

    /// Store the output of batch `batch_index`.
    pub fn append(&self, batch_index: usize, batch: EmbeddingMatrix) -> Result<(), EvalError> {
        let mut state = self.lock()?;

        if state.batches.contains_key(&batch_index) {
            return Err(EvalError::DuplicateBatch(batch_index));
        }
        match state.dim {
            Some(dim) if dim != batch.dim() => {
                return Err(EvalError::DimMismatch { expected: dim, actual: batch.dim() });
            }
            Some(_) => {}
            None => state.dim = Some(batch.dim()),
        }

        tracing::debug!("Appending batch {} ({} rows)", batch_index, batch.rows());
        state.batches.insert(batch_index, batch);
        Ok(())
    }

    /// Throw away the current pass. Returns the number of rows dropped.
    pub fn clear(&self) -> Result<usize, EvalError> {
        let mut state = self.lock()?;
        let dropped = state.rows();
        *state = PassState::default();
        Ok(dropped)
    }

    /// Rows appended so far in the current pass.
    pub fn pending_rows(&self) -> Result<usize, EvalError> {
        Ok(self.lock()?.rows())
    }

    /// Poison the lock the way a panicking appender would.
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        std::thread::scope(|s| {
            let handle = s.spawn(|| {
                let _guard = self.state.lock();
                panic!("appender died while holding the accumulator lock");
            });
            assert!(handle.join().is_err());
        });
    }

    /// Read the whole pass as one matrix and clear the target.
    ///
    /// Fails if nothing was appended or if any batch index between 0
    /// and the highest one seen is missing. The target is cleared
    /// either way so a broken pass cannot leak into the next one.
    pub fn drain(&self) -> Result<EmbeddingMatrix, EvalError> {
        let taken = {
            let mut state = self.lock()?;
            std::mem::take(&mut *state)
        };

        let dim = taken.dim.ok_or(EvalError::Empty)?;
        let mut out = EmbeddingMatrix::empty(dim);
        for (expected, (index, batch)) in taken.batches.iter().enumerate() {
            if *index != expected {
                return Err(EvalError::MissingBatch(expected));
            }
            out.extend(batch)?;
        }

        tracing::debug!(
            "Drained {} rows from {} batches of the '{}' pass",
            out.rows(),
            taken.batches.len(),
            taken.mode.map(|m| m.as_str()).unwrap_or("?"),
        );
        Ok(out)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    /// A batch whose rows are [global_row_index, global_row_index].
    fn batch_of(index: usize, size: usize) -> EmbeddingMatrix {
        let rows = (0..size)
            .map(|r| {
                let g = (index * size + r) as f32;
                vec![g, g]
            })
            .collect();
        EmbeddingMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_concurrent_appends_keep_submission_order() {
        let acc = EmbeddingAccumulator::new();
        acc.reset(CorpusMode::English).unwrap();

        // Five workers finish in scrambled order
        std::thread::scope(|s| {
            for index in [3, 0, 4, 1, 2] {
                let acc = &acc;
                s.spawn(move || acc.append(index, batch_of(index, 32)).unwrap());
            }
        });

        let m = acc.drain().unwrap();
        assert_eq!(m.rows(), 160);
        for (i, row) in m.iter_rows().enumerate() {
            assert_eq!(row, &[i as f32, i as f32], "row {i} out of place");
        }
        // Drain leaves the target empty
        assert_eq!(acc.pending_rows().unwrap(), 0);
    }

    #[test]
    fn test_duplicate_batch_rejected() {
        let acc = EmbeddingAccumulator::new();
        acc.reset(CorpusMode::Indic).unwrap();
        acc.append(0, batch_of(0, 4)).unwrap();
        assert_eq!(acc.append(0, batch_of(0, 4)), Err(EvalError::DuplicateBatch(0)));
        assert_eq!(acc.pending_rows().unwrap(), 4);
    }

    #[test]
    fn test_gap_fails_drain_and_clears() {
        let acc = EmbeddingAccumulator::new();
        acc.reset(CorpusMode::English).unwrap();
        acc.append(0, batch_of(0, 2)).unwrap();
        acc.append(2, batch_of(2, 2)).unwrap();
        assert_eq!(acc.drain().unwrap_err(), EvalError::MissingBatch(1));
        assert_eq!(acc.pending_rows().unwrap(), 0);
    }

    #[test]
    fn test_dimension_change_rejected() {
        let acc = EmbeddingAccumulator::new();
        acc.reset(CorpusMode::English).unwrap();
        acc.append(0, batch_of(0, 2)).unwrap();
        let wide = EmbeddingMatrix::from_rows(vec![vec![0.0; 3]]).unwrap();
        assert_eq!(
            acc.append(1, wide),
            Err(EvalError::DimMismatch { expected: 2, actual: 3 })
        );
    }

    #[test]
    fn test_reset_discards_stale_rows() {
        let acc = EmbeddingAccumulator::new();
        acc.reset(CorpusMode::English).unwrap();
        acc.append(0, batch_of(0, 8)).unwrap();
        // Next pass starts without draining the previous one
        acc.reset(CorpusMode::Indic).unwrap();
        assert_eq!(acc.pending_rows().unwrap(), 0);
        acc.append(0, batch_of(5, 3)).unwrap();
        let m = acc.drain().unwrap();
        assert_eq!(m.rows(), 3);
        assert_eq!(m.row(0), &[15.0, 15.0]);
    }

    #[test]
    fn test_clear_drops_partial_pass() {
        let acc = EmbeddingAccumulator::new();
        acc.reset(CorpusMode::English).unwrap();
        acc.append(0, batch_of(0, 4)).unwrap();
        acc.append(1, batch_of(1, 4)).unwrap();
        assert_eq!(acc.clear().unwrap(), 8);
        assert_eq!(acc.pending_rows().unwrap(), 0);
    }

    #[test]
    fn test_empty_drain_is_error() {
        let acc = EmbeddingAccumulator::new();
        acc.reset(CorpusMode::English).unwrap();
        assert_eq!(acc.drain().unwrap_err(), EvalError::Empty);
    }

    #[test]
    fn test_poisoned_lock_refuses_append() {
        let acc = EmbeddingAccumulator::new();
        acc.poison();
        assert_eq!(acc.append(0, batch_of(0, 1)), Err(EvalError::LockPoisoned));
        assert_eq!(acc.drain().unwrap_err(), EvalError::LockPoisoned);
    }
}
