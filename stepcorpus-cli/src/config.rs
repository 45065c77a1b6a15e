use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use stepcorpus_rs::StepCorpusConfig;

/// Command-line arguments. Anything left unset falls back to the
/// environment (see [`StepCorpusConfig::from_env`]).
#[derive(Parser, Debug)]
#[command(
    name = "stepcorpus",
    version,
    about = "Extract BDD scenario steps and merge them into a deduplicated step corpus"
)]
pub struct Cli {
    /// Scenario file to extract steps from. Env: `STEPCORPUS_SCENARIO_PATH`, default `sample.feature`.
    #[arg(long)]
    pub scenario: Option<PathBuf>,

    /// Corpus JSON file to read and update. Env: `STEPCORPUS_CORPUS_PATH`, default `output.json`.
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Cosine similarity at or above which a step counts as a duplicate.
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Report format written to stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, default_value_t = false)]
    pub log_json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    /// Layer the command-line overrides on top of `config`.
    ///
    /// The caller re-validates afterwards; an override such as
    /// `--threshold 2` only fails at that point.
    pub fn apply(&self, config: &mut StepCorpusConfig) {
        if let Some(path) = &self.scenario {
            config.scenario_path = path.clone();
        }
        if let Some(path) = &self.corpus {
            config.corpus_path = path.clone();
        }
        if let Some(threshold) = self.threshold {
            config.similarity_threshold = threshold;
        }
    }
}
