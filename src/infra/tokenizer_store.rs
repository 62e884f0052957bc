// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads the pretrained tokenizer that ships with the encoder.
//
// The tokenizer must be the one the encoder was trained with:
// token ids index straight into the embedding table, so a
// different vocabulary silently produces garbage vectors.
// It is therefore always read from the model directory and
// never rebuilt from the evaluation corpus.

use anyhow::Result;
use std::path::PathBuf;
use tokenizers::Tokenizer;

const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Load the HuggingFace `tokenizer.json` from the model directory.
    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        let tokenizer = Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!(
                "Cannot load tokenizer from '{}': {}", path.display(), e
            ))?;
        tracing::info!(
            "Loaded tokenizer from '{}' ({} tokens)",
            path.display(),
            tokenizer.get_vocab_size(true)
        );
        Ok(tokenizer)
    }
}
