// ============================================================
// Layer 4 — Sentence Batcher
// ============================================================
// Implements Burn's Batcher trait to stack featurized sentences
// into device tensors.
//
// How batching works here:
//   Input:  Vec of N SentenceSamples, each with S ids
//   Output: SentenceBatch with tensors of shape [N, S]
//
//   We flatten all input_ids into one long Vec, then reshape:
//   [s1_t1, s1_t2, ..., s1_tS, s2_t1, ..., sN_tS] → [N, S]
//
// Row n of every output tensor is sample n of the input Vec:
// the batcher never reorders, which the encoder pass relies on.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::features::SentenceSample;

// ─── SentenceBatch ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct SentenceBatch<B: Backend> {
    /// Token ids — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding — shape: [batch_size, seq_len]
    pub attention_mask: Tensor<B, 2, Int>,
}

// ─── SentenceBatcher ──────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct SentenceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SentenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SentenceSample, SentenceBatch<B>> for SentenceBatcher<B> {
    fn batch(&self, items: Vec<SentenceSample>) -> SentenceBatch<B> {
        let batch_size = items.len();
        // All samples are pre-padded to the same length
        let seq_len = items.first().map(|s| s.input_ids.len()).unwrap_or(0);

        let input_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.input_ids.iter().map(|&x| x as i32))
            .collect();

        let mask_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.attention_mask.iter().map(|&x| x as i32))
            .collect();

        let input_ids = Tensor::<B, 1, Int>::from_ints(
            input_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        let attention_mask = Tensor::<B, 1, Int>::from_ints(
            mask_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        SentenceBatch { input_ids, attention_mask }
    }
}
