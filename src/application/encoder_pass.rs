// ============================================================
// Layer 2 — Encoder Pass
// ============================================================
// Runs one corpus side through a BatchEncoder and returns its
// embedding matrix.
//
//   Step 1: Reset the accumulator      (drops stale rows)
//   Step 2: Split sentences into batches of `batch_size`
//   Step 3: Encode batch i, append it under index i
//   Step 4: Drain the accumulator      (rows in batch order)
//
// Any failing batch aborts the pass and clears the accumulator.
// A pass never returns a matrix with skipped rows: downstream
// scoring pairs rows purely by position.

use anyhow::{bail, Context, Result};

use crate::domain::corpus::SentenceCorpus;
use crate::domain::embedding::EmbeddingMatrix;
use crate::domain::traits::BatchEncoder;
use crate::infra::accumulator::EmbeddingAccumulator;

/// Sentences encoded per forward pass.
pub const DEFAULT_BATCH_SIZE: usize = 32;

pub struct EncoderPass<'a, E: BatchEncoder> {
    encoder:     &'a E,
    accumulator: &'a EmbeddingAccumulator,
    batch_size:  usize,
}

impl<'a, E: BatchEncoder> EncoderPass<'a, E> {
    pub fn new(
        encoder:     &'a E,
        accumulator: &'a EmbeddingAccumulator,
        batch_size:  usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        Ok(Self { encoder, accumulator, batch_size })
    }

    pub fn run(&self, corpus: &SentenceCorpus) -> Result<EmbeddingMatrix> {
        if corpus.is_empty() {
            bail!("'{}' corpus is empty; nothing to encode", corpus.mode);
        }

        self.accumulator.reset(corpus.mode)?;

        if let Err(e) = self.encode_batches(corpus) {
            match self.accumulator.clear() {
                Ok(dropped) => tracing::warn!(
                    "Aborting '{}' pass, dropped {} partial rows", corpus.mode, dropped
                ),
                Err(clear_err) => tracing::warn!(
                    "Aborting '{}' pass; partial rows could not be cleared: {}", corpus.mode, clear_err
                ),
            }
            return Err(e);
        }

        let matrix = self.accumulator.drain()?;
        if matrix.rows() != corpus.len() {
            bail!(
                "'{}' pass produced {} rows for {} sentences",
                corpus.mode, matrix.rows(), corpus.len()
            );
        }

        tracing::info!(
            "Encoded {} '{}' sentences into a {}x{} matrix",
            corpus.len(), corpus.mode, matrix.rows(), matrix.dim()
        );
        Ok(matrix)
    }

    fn encode_batches(&self, corpus: &SentenceCorpus) -> Result<()> {
        let total = corpus.len().div_ceil(self.batch_size);

        for (index, chunk) in corpus.sentences.chunks(self.batch_size).enumerate() {
            let out = self.encoder
                .encode_batch(chunk)
                .with_context(|| format!("Encoding batch {}/{} of '{}' corpus", index + 1, total, corpus.mode))?;

            if out.rows() != chunk.len() {
                bail!(
                    "Batch {} of '{}' corpus returned {} rows for {} sentences",
                    index, corpus.mode, out.rows(), chunk.len()
                );
            }

            self.accumulator.append(index, out)?;
            tracing::debug!("Batch {}/{} of '{}' done", index + 1, total, corpus.mode);
        }
        Ok(())
    }
}
