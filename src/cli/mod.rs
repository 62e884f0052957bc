// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// One command is supported:
//   `evaluate` — encodes an English/Indic sentence pair corpus
//                and prints retrieval accuracy@k
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvalArgs};

#[derive(Parser, Debug)]
#[command(
    name = "xsent-retrieval",
    version = "0.1.0",
    about = "Evaluate cross-lingual sentence retrieval (English ↔ Indic) with a pretrained encoder."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_evaluate(args: EvalArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    tracing::info!(
        "Evaluating en-{} retrieval with encoder in '{}'",
        args.lang, args.model_dir
    );

    let use_case = EvaluateUseCase::new(args.into());
    let record   = use_case.execute()?;

    println!("Accuracy:  {}", record.report.accuracy);
    Ok(())
}
