// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Orchestrates one cross-lingual retrieval evaluation:
//
//   Step 1: Load English + Indic corpora   (Layer 4 - data)
//   Step 2: Check they are line-aligned    (Layer 3 - domain)
//   Step 3: Load tokenizer + encoder       (Layer 6 - infra, Layer 5 - ml)
//           and validate top-k / alignment rows
//   Step 4: English encoder pass           (Layer 2 - encoder_pass)
//   Step 5: Indic encoder pass             (same accumulator, reset first)
//   Step 6: Accuracy@k over both matrices  (Layer 7 - scoring)
//   Step 7: Log the result                 (Layer 6 - infra)
//
// Corpora are checked before the model is touched so a
// mismatched pair fails in milliseconds, not after a GPU pass.
//
// Reference: Rust Book §13 (Iterators and Closures)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::application::encoder_pass::{EncoderPass, DEFAULT_BATCH_SIZE};
use crate::data::loader::MkbLoader;
use crate::domain::corpus::{ensure_aligned, CorpusMode, SentenceCorpus};
use crate::domain::traits::{BatchEncoder, CorpusSource};
use crate::infra::{
    accumulator::EmbeddingAccumulator,
    checkpoint::CheckpointManager,
    metrics::{EvalRecord, MetricsLogger},
    tokenizer_store::TokenizerStore,
};
use crate::ml::inferencer::{EmbeddingExtractor, InferBackend};
use crate::ml::model::DEFAULT_POOL_PREFIX_LEN;
use crate::scoring::accuracy::{RetrievalScorer, DEFAULT_TOP_K};

/// `results/xsr_<YYYYmmdd_HHMMSS>` in local time.
pub fn default_output_dir() -> String {
    chrono::Local::now().format("results/xsr_%Y%m%d_%H%M%S").to_string()
}

// ─── Evaluation Configuration ────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    pub data_dir:        String,
    /// Indic language code, e.g. "hi"
    pub lang:            String,
    /// Holds encoder_config.json, encoder.mpk.gz and tokenizer.json
    pub model_dir:       String,
    pub max_seq_len:     usize,
    pub batch_size:      usize,
    pub pool_prefix_len: usize,
    pub top_k:           usize,
    /// Fit a linear map on this many leading pairs before scoring
    pub align_rows:      Option<usize>,
    pub output_dir:      String,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            data_dir:        "data".to_string(),
            lang:            "hi".to_string(),
            model_dir:       "models/encoder".to_string(),
            max_seq_len:     128,
            batch_size:      DEFAULT_BATCH_SIZE,
            pool_prefix_len: DEFAULT_POOL_PREFIX_LEN,
            top_k:           DEFAULT_TOP_K,
            align_rows:      None,
            output_dir:      default_output_dir(),
        }
    }
}

// ─── EvaluateUseCase ─────────────────────────────────────────────────────────
pub struct EvaluateUseCase {
    config: EvalConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    /// Full run against the files on disk and the pretrained encoder.
    pub fn execute(&self) -> Result<EvalRecord> {
        let cfg = &self.config;

        let loader = MkbLoader::new(&cfg.data_dir, &cfg.lang)?;
        let (english, indic) = self.load_corpora(&loader)?;

        let tokenizer = TokenizerStore::new(&cfg.model_dir).load()?;
        let ckpt      = CheckpointManager::new(&cfg.model_dir);
        let device    = Default::default();
        let extractor = EmbeddingExtractor::<InferBackend>::from_checkpoint(
            &ckpt,
            tokenizer,
            cfg.max_seq_len,
            cfg.pool_prefix_len,
            &device,
        )
        .with_context(|| format!("Cannot load encoder from '{}'", cfg.model_dir))?;

        self.evaluate(&english, &indic, &extractor)
    }

    /// Steps 1–2: both sides of the pair, checked for alignment.
    pub fn load_corpora<S: CorpusSource>(&self, source: &S) -> Result<(SentenceCorpus, SentenceCorpus)> {
        let english = source.load(CorpusMode::English)?;
        let indic   = source.load(CorpusMode::Indic)?;
        ensure_aligned(&english, &indic)
            .with_context(|| format!("English and '{}' corpora are not line-aligned", self.config.lang))?;

        tracing::info!("Loaded {} aligned sentence pairs (en-{})", english.len(), self.config.lang);
        Ok((english, indic))
    }

    /// Scorer checks, then steps 4–7 with any encoder.
    pub fn evaluate<E: BatchEncoder>(
        &self,
        english: &SentenceCorpus,
        indic:   &SentenceCorpus,
        encoder: &E,
    ) -> Result<EvalRecord> {
        let cfg = &self.config;

        // Settings the scorer would reject must fail before any encoding
        let mut scorer = RetrievalScorer::new(cfg.top_k)?;
        if let Some(rows) = cfg.align_rows {
            scorer = scorer.with_alignment(rows);
        }
        scorer.check_rows(english.len())?;

        // One accumulation target, reused by both passes
        let accumulator = EmbeddingAccumulator::new();
        let pass        = EncoderPass::new(encoder, &accumulator, cfg.batch_size)?;

        let sentvecs_en = pass.run(english).context("English encoder pass failed")?;
        let sentvecs_in = pass.run(indic).context("Indic encoder pass failed")?;

        let report = scorer.score(&sentvecs_en, &sentvecs_in)?;

        let record = EvalRecord {
            timestamp:       chrono::Local::now().to_rfc3339(),
            lang:            cfg.lang.clone(),
            model_dir:       cfg.model_dir.clone(),
            sentences:       english.len(),
            pool_prefix_len: cfg.pool_prefix_len,
            report,
        };
        MetricsLogger::new(&cfg.output_dir)?.log(&record)?;

        Ok(record)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::encoder_pass::tests::IndexEncoder;
    use crate::domain::embedding::EmbeddingMatrix;
    use std::cell::Cell;
    use std::fs;
    use std::path::Path;

    /// Counts calls and refuses to encode anything.
    struct CountingEncoder {
        calls: Cell<usize>,
    }

    impl BatchEncoder for CountingEncoder {
        fn encode_batch(&self, _sentences: &[String]) -> Result<EmbeddingMatrix> {
            self.calls.set(self.calls.get() + 1);
            anyhow::bail!("should not be called")
        }
    }

    fn write_pair(root: &Path, en: usize, hi: usize) {
        let dir = root.join("mkb").join("hi");
        fs::create_dir_all(&dir).unwrap();
        let lines = |prefix: &str, n: usize| {
            (0..n).map(|i| format!("{prefix}-{i}")).collect::<Vec<_>>().join("\n")
        };
        fs::write(dir.join("mkb.en"), lines("en", en)).unwrap();
        fs::write(dir.join("mkb.hi"), lines("in", hi)).unwrap();
    }

    fn config(root: &Path, top_k: usize) -> EvalConfig {
        EvalConfig {
            data_dir:   root.to_string_lossy().into_owned(),
            lang:       "hi".to_string(),
            batch_size: 32,
            top_k,
            output_dir: root.join("out").to_string_lossy().into_owned(),
            ..EvalConfig::default()
        }
    }

    #[test]
    fn test_matching_pairs_score_one_and_get_logged() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), 150, 150);

        let use_case = EvaluateUseCase::new(config(dir.path(), 1));
        let loader   = MkbLoader::new(dir.path(), "hi").unwrap();
        let (en, hi) = use_case.load_corpora(&loader).unwrap();
        let record   = use_case.evaluate(&en, &hi, &IndexEncoder).unwrap();

        assert_eq!(record.sentences, 150);
        assert_eq!(record.report.queries, 150);
        assert_eq!(record.report.accuracy, 1.0);

        let csv = fs::read_to_string(dir.path().join("out").join("results.csv")).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(dir.path().join("out").join("eval_report.json").exists());
    }

    #[test]
    fn test_misaligned_corpora_fail_before_encoding() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), 10, 9);

        let use_case = EvaluateUseCase::new(config(dir.path(), 1));
        let loader   = MkbLoader::new(dir.path(), "hi").unwrap();
        let encoder  = CountingEncoder { calls: Cell::new(0) };

        let err = use_case
            .load_corpora(&loader)
            .and_then(|(en, hi)| use_case.evaluate(&en, &hi, &encoder))
            .unwrap_err();

        assert!(format!("{err:#}").contains("not line-aligned"));
        assert_eq!(encoder.calls.get(), 0);
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_encoder_failure_writes_no_results() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), 5, 5);

        let use_case = EvaluateUseCase::new(config(dir.path(), 1));
        let loader   = MkbLoader::new(dir.path(), "hi").unwrap();
        let (en, hi) = use_case.load_corpora(&loader).unwrap();
        let encoder  = CountingEncoder { calls: Cell::new(0) };

        let err = use_case.evaluate(&en, &hi, &encoder).unwrap_err();
        assert!(format!("{err:#}").contains("English encoder pass failed"));
        assert_eq!(encoder.calls.get(), 1);
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_bad_scoring_settings_fail_before_encoding() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), 5, 5);

        let zero_k = EvaluateUseCase::new(config(dir.path(), 0));
        let loader = MkbLoader::new(dir.path(), "hi").unwrap();
        let (en, hi) = zero_k.load_corpora(&loader).unwrap();

        let encoder = CountingEncoder { calls: Cell::new(0) };
        assert!(zero_k.evaluate(&en, &hi, &encoder).is_err());

        let too_many_fit_rows = EvaluateUseCase::new(EvalConfig {
            align_rows: Some(5),
            ..config(dir.path(), 1)
        });
        let err = too_many_fit_rows.evaluate(&en, &hi, &encoder).unwrap_err();
        assert!(err.to_string().contains("alignment"), "{err}");

        assert_eq!(encoder.calls.get(), 0);
    }

    #[test]
    fn test_default_output_dir_is_timestamped() {
        let dir = default_output_dir();
        assert!(dir.starts_with("results/xsr_"));
        assert_eq!(dir.len(), "results/xsr_".len() + "YYYYmmdd_HHMMSS".len());
    }
}
