// ============================================================
// Layer 6 — Results Logger
// ============================================================
// Records the outcome of each evaluation run.
//
//   <output_dir>/results.csv      ← one row appended per run
//   <output_dir>/eval_report.json ← full record of the latest run
//
// Example CSV output:
//   timestamp,lang,model_dir,sentences,top_k,pool_prefix_len,align_rows,accuracy,degenerate
//   2026-10-18T09:12:44+00:00,hi,models/xlmr,5069,100,32,,0.412902,false
//
// The CSV lets several runs (languages, checkpoints, prefix
// lengths) share one file for comparison; the JSON is there for
// scripts that only want the last number.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

use crate::scoring::accuracy::AccuracyReport;

const CSV_HEADER: &str =
    "timestamp,lang,model_dir,sentences,top_k,pool_prefix_len,align_rows,accuracy,degenerate";

/// Everything worth keeping about one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalRecord {
    /// RFC 3339 time the run finished
    pub timestamp:       String,
    pub lang:            String,
    pub model_dir:       String,
    /// Aligned sentence pairs encoded per side
    pub sentences:       usize,
    pub pool_prefix_len: usize,
    pub report:          AccuracyReport,
}

impl EvalRecord {
    fn csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{:.6},{}",
            self.timestamp,
            self.lang,
            self.model_dir.replace(',', "_"),
            self.sentences,
            self.report.top_k,
            self.pool_prefix_len,
            self.report.align_rows.map(|r| r.to_string()).unwrap_or_default(),
            self.report.accuracy,
            self.report.degenerate,
        )
    }
}

pub struct MetricsLogger {
    dir:      PathBuf,
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the output directory and the CSV header if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output dir '{}'", dir.display()))?;

        let csv_path = dir.join("results.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{CSV_HEADER}")?;
            tracing::debug!("Created results CSV: '{}'", csv_path.display());
        }

        Ok(Self { dir, csv_path })
    }

    /// Append the run to the CSV and overwrite the JSON report.
    pub fn log(&self, record: &EvalRecord) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        writeln!(f, "{}", record.csv_row())?;

        let report_path = self.dir.join("eval_report.json");
        fs::write(&report_path, serde_json::to_string_pretty(record)?)
            .with_context(|| format!("Cannot write '{}'", report_path.display()))?;

        tracing::info!(
            "Logged accuracy@{}={:.4} to '{}'",
            record.report.top_k,
            record.report.accuracy,
            self.csv_path.display(),
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
