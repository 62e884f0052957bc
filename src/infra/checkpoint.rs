// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Restores a pretrained encoder from a model directory using
// Burn's CompactRecorder.
//
// Model directory layout:
//   <model_dir>/
//     encoder_config.json   ← SentenceEncoderConfig (architecture)
//     encoder.mpk.gz        ← weights
//     tokenizer.json        ← HuggingFace tokenizer (see TokenizerStore)
//
// The config is read first so the model can be rebuilt with the
// exact architecture before the weights are loaded into it.
//
// Burn's CompactRecorder:
//   - Serialises model parameters to MessagePack format
//   - Compresses with gzip, stores floats at half precision
//   - Type-safe: loading fails if architecture doesn't match
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::ml::model::{SentenceEncoder, SentenceEncoderConfig};

const CONFIG_FILE:  &str = "encoder_config.json";
// CompactRecorder appends the .mpk.gz extension itself
const WEIGHTS_FILE: &str = "encoder";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load weights into a freshly initialised model of the right shape.
    pub fn load_model<B: Backend>(
        &self,
        model:  SentenceEncoder<B>,
        device: &B::Device,
    ) -> Result<SentenceEncoder<B>> {
        let path = self.dir.join(WEIGHTS_FILE);
        tracing::info!("Loading encoder weights from '{}'", path.display());

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load encoder weights '{}.mpk.gz'. Does the model directory hold a pretrained encoder?",
                    path.display()
                )
            })?;

        Ok(model.load_record(record))
    }

    pub fn load_config(&self) -> Result<SentenceEncoderConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read encoder config from '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed encoder config in '{}'", path.display()))
    }
}
