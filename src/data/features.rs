// ============================================================
// Layer 4 — Sentence Featurizer
// ============================================================
// Turns one sentence into fixed-length model input:
//
//   [CLS] tok_1 tok_2 ... tok_k [SEP] [PAD] ... [PAD]
//   └──────────────── max_seq_len ─────────────────┘
//
// Long sentences lose tokens from the end but always keep the
// closing [SEP]. Every sample has exactly max_seq_len ids, so
// the batcher can stack them without dynamic padding.
//
// Special token ids are looked up in the tokenizer's vocabulary
// under the BERT names ([CLS] [SEP] [PAD]) and then the RoBERTa /
// XLM-R names (<s> </s> <pad>). A tokenizer that defines neither
// is rejected: guessing ids would feed ordinary vocabulary tokens
// to the encoder as sentence boundaries.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

/// One tokenised and padded sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceSample {
    pub input_ids:      Vec<u32>,
    /// 1 = real token, 0 = padding
    pub attention_mask: Vec<u32>,
}

impl SentenceSample {
    /// Number of non-padding positions.
    pub fn real_len(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}

pub struct Featurizer {
    tokenizer:   Tokenizer,
    max_seq_len: usize,
    cls_id:      u32,
    sep_id:      u32,
    pad_id:      u32,
}

impl Featurizer {
    pub fn new(tokenizer: Tokenizer, max_seq_len: usize) -> Result<Self> {
        if max_seq_len < 2 {
            bail!("max_seq_len must leave room for [CLS] and [SEP], got {}", max_seq_len);
        }
        let cls_id = special_id(&tokenizer, &["[CLS]", "<s>"])?;
        let sep_id = special_id(&tokenizer, &["[SEP]", "</s>"])?;
        let pad_id = special_id(&tokenizer, &["[PAD]", "<pad>"])?;
        tracing::debug!("Special ids: cls={} sep={} pad={}", cls_id, sep_id, pad_id);
        Ok(Self { tokenizer, max_seq_len, cls_id, sep_id, pad_id })
    }

    pub fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }

    pub fn featurize(&self, sentence: &str) -> Result<SentenceSample> {
        let enc = self.tokenizer
            .encode(sentence, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;

        let body_len = enc.get_ids().len().min(self.max_seq_len - 2);

        let mut input_ids = Vec::with_capacity(self.max_seq_len);
        input_ids.push(self.cls_id);
        input_ids.extend_from_slice(&enc.get_ids()[..body_len]);
        input_ids.push(self.sep_id);

        let real = input_ids.len();
        let mut attention_mask = vec![1u32; real];
        input_ids.resize(self.max_seq_len, self.pad_id);
        attention_mask.resize(self.max_seq_len, 0);

        Ok(SentenceSample { input_ids, attention_mask })
    }

    /// Featurize a batch, preserving order.
    pub fn featurize_all(&self, sentences: &[String]) -> Result<Vec<SentenceSample>> {
        sentences.iter().map(|s| self.featurize(s)).collect()
    }
}

/// Id of the first of `names` the tokenizer knows.
fn special_id(tokenizer: &Tokenizer, names: &[&str]) -> Result<u32> {
    names
        .iter()
        .find_map(|name| tokenizer.token_to_id(name))
        .with_context(|| format!("Tokenizer defines none of the special tokens {:?}", names))
}
