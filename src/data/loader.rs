// ============================================================
// Layer 4 — Parallel Corpus Loader
// ============================================================
// Reads the two sides of a Mann Ki Baat style parallel corpus.
//
// Expected layout under the data directory:
//
//   <data_dir>/
//     mkb/
//       hi/
//         mkb.en     ← English side, one sentence per line
//         mkb.hi     ← Hindi side, line i translates line i of mkb.en
//       ta/
//         mkb.en
//         mkb.ta
//
// Every line becomes one sentence, empty or not, so the two
// sides stay aligned by line number. A missing file is an error:
// an empty corpus would only surface later as a useless score.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (Reading a File)

use anyhow::{bail, Context, Result};
use std::{fs, path::PathBuf};

use crate::data::preprocessor::Preprocessor;
use crate::domain::corpus::{CorpusMode, SentenceCorpus};
use crate::domain::traits::CorpusSource;

pub struct MkbLoader {
    data_dir:     PathBuf,
    lang:         String,
    preprocessor: Preprocessor,
}

impl MkbLoader {
    /// Create a loader for the `lang` pair under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>, lang: impl Into<String>) -> Result<Self> {
        let lang = lang.into();
        if lang.is_empty()
            || lang == "en"
            || !lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            bail!("Invalid language code '{}': expected an Indic code such as 'hi' or 'ta'", lang);
        }
        Ok(Self { data_dir: data_dir.into(), lang, preprocessor: Preprocessor::new() })
    }

    /// File holding the requested side of the pair.
    pub fn corpus_path(&self, mode: CorpusMode) -> PathBuf {
        let ext = match mode {
            CorpusMode::English => "en",
            CorpusMode::Indic   => self.lang.as_str(),
        };
        self.data_dir
            .join("mkb")
            .join(&self.lang)
            .join(format!("mkb.{ext}"))
    }
}

impl CorpusSource for MkbLoader {
    fn load(&self, mode: CorpusMode) -> Result<SentenceCorpus> {
        let path = self.corpus_path(mode);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}' corpus from '{}'", mode, path.display()))?;

        let sentences: Vec<String> = text
            .lines()
            .map(|line| self.preprocessor.clean_sentence(line))
            .collect();

        let blank = sentences.iter().filter(|s| s.is_empty()).count();
        if blank > 0 {
            tracing::warn!("'{}' corpus has {} empty lines; kept to preserve alignment", mode, blank);
        }

        tracing::info!("Loaded {} '{}' sentences from '{}'", sentences.len(), mode, path.display());
        Ok(SentenceCorpus::new(mode, sentences))
    }
}
