// ============================================================
// Layer 5 — Embedding Extractor
// ============================================================
use anyhow::{bail, Result};
use burn::{data::dataloader::batcher::Batcher, prelude::*};
use tokenizers::Tokenizer;

use crate::data::{batcher::SentenceBatcher, features::Featurizer};
use crate::domain::embedding::EmbeddingMatrix;
use crate::domain::traits::BatchEncoder;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{mean_pool_prefix, SentenceEncoder};

pub type InferBackend = burn::backend::Wgpu;

pub struct EmbeddingExtractor<B: Backend> {
    model:           SentenceEncoder<B>,
    featurizer:      Featurizer,
    batcher:         SentenceBatcher<B>,
    pool_prefix_len: usize,
}

impl<B: Backend> EmbeddingExtractor<B> {
    pub fn new(
        model:           SentenceEncoder<B>,
        featurizer:      Featurizer,
        pool_prefix_len: usize,
        device:          B::Device,
    ) -> Result<Self> {
        if pool_prefix_len == 0 {
            bail!("pool_prefix_len must be at least 1");
        }
        if featurizer.max_seq_len() > model.max_seq_len {
            bail!(
                "max_seq_len {} exceeds the encoder's {} learned positions",
                featurizer.max_seq_len(), model.max_seq_len
            );
        }
        if pool_prefix_len > featurizer.max_seq_len() {
            tracing::warn!(
                "pool_prefix_len {} is longer than max_seq_len {}; pooling over the whole sequence",
                pool_prefix_len, featurizer.max_seq_len()
            );
        }
        Ok(Self { model, featurizer, batcher: SentenceBatcher::new(device), pool_prefix_len })
    }

    pub fn from_checkpoint(
        ckpt_manager:    &CheckpointManager,
        tokenizer:       Tokenizer,
        max_seq_len:     usize,
        pool_prefix_len: usize,
        device:          &B::Device,
    ) -> Result<Self> {
        let cfg   = ckpt_manager.load_config()?;
        let model = ckpt_manager.load_model(cfg.init::<B>(device), device)?;
        tracing::info!(
            "Encoder loaded: {} layers, d_model={}, {} positions",
            cfg.num_layers, cfg.d_model, cfg.max_seq_len
        );
        let featurizer = Featurizer::new(tokenizer, max_seq_len)?;
        Self::new(model, featurizer, pool_prefix_len, device.clone())
    }

    /// Pooled vectors for `sentences`, one row each, in input order.
    pub fn embed(&self, sentences: &[String]) -> Result<EmbeddingMatrix> {
        if sentences.is_empty() {
            bail!("Cannot embed an empty batch");
        }
        let samples = self.featurizer.featurize_all(sentences)?;
        let batch   = self.batcher.batch(samples);

        let hidden = self.model.forward(batch.input_ids, batch.attention_mask);
        let pooled = mean_pool_prefix(hidden, self.pool_prefix_len);
        let [rows, dim] = pooled.dims();

        let data: Vec<f32> = pooled
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read pooled embeddings: {e:?}"))?;

        let matrix = EmbeddingMatrix::from_flat(data, dim)?;
        debug_assert_eq!(matrix.rows(), rows);
        Ok(matrix)
    }
}

impl<B: Backend> BatchEncoder for EmbeddingExtractor<B> {
    fn encode_batch(&self, sentences: &[String]) -> Result<EmbeddingMatrix> {
        self.embed(sentences)
    }
}
