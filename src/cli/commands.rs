// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the `evaluate` subcommand and its flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::evaluate_use_case::{default_output_dir, EvalConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score English → Indic sentence retrieval with a pretrained encoder
    Evaluate(EvalArgs),
}

/// All arguments for the `evaluate` command.
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Root of the parallel data; sentences are read from
    /// <data_dir>/mkb/<lang>/mkb.en and mkb.<lang>
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Indic language code (hi, ta, bn, ...)
    #[arg(long)]
    pub lang: String,

    /// Directory with encoder_config.json, encoder.mpk.gz and tokenizer.json
    #[arg(long)]
    pub model_dir: String,

    /// Tokens per sentence including [CLS] and [SEP]; longer input is cut
    #[arg(long, default_value_t = 128)]
    pub max_seq_len: usize,

    /// Sentences per forward pass
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Token positions averaged into the sentence vector
    #[arg(long, default_value_t = 32)]
    pub pool_prefix_len: usize,

    /// A query counts as a hit when its partner ranks within this many candidates
    #[arg(long, default_value_t = 100)]
    pub top_k: usize,

    /// Fit a linear English→Indic map on this many leading pairs and
    /// score only the remaining ones
    #[arg(long)]
    pub align_rows: Option<usize>,

    /// Where results.csv and eval_report.json go
    /// [default: results/xsr_<YYYYmmdd_HHMMSS>]
    #[arg(long)]
    pub output_dir: Option<String>,
}

/// The application layer never sees clap types.
impl From<EvalArgs> for EvalConfig {
    fn from(a: EvalArgs) -> Self {
        EvalConfig {
            data_dir:        a.data_dir,
            lang:            a.lang,
            model_dir:       a.model_dir,
            max_seq_len:     a.max_seq_len,
            batch_size:      a.batch_size,
            pool_prefix_len: a.pool_prefix_len,
            top_k:           a.top_k,
            align_rows:      a.align_rows,
            output_dir:      a.output_dir.unwrap_or_else(default_output_dir),
        }
    }
}
