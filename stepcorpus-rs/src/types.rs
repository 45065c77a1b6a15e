//! Shared configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::embedder::openai::DEFAULT_MODEL as DEFAULT_EMBEDDING_MODEL;
use crate::llm_client::openai::DEFAULT_MODEL as DEFAULT_CHAT_MODEL;
use crate::matcher::DEFAULT_SIMILARITY_THRESHOLD;

const DEFAULT_CORPUS_PATH: &str = "output.json";
const DEFAULT_SCENARIO_PATH: &str = "sample.feature";

fn validate_non_empty_path(path: &PathBuf) -> Result<(), validator::ValidationError> {
    if path.as_os_str().is_empty() {
        return Err(validator::ValidationError::new("path must not be empty"));
    }
    Ok(())
}

/// Central configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StepCorpusConfig {
    /// OpenAI API key.
    #[validate(length(min = 1))]
    pub openai_api_key: String,

    /// Optional OpenAI-compatible base URL.
    pub openai_base_url: Option<String>,

    /// Chat model used for step extraction.
    #[validate(length(min = 1))]
    pub model_name: String,

    /// Embedding model used for similarity.
    #[validate(length(min = 1))]
    pub embedding_model: String,

    /// Cosine similarity at or above which a candidate is a duplicate.
    #[validate(range(min = 0.0, max = 1.0))]
    pub similarity_threshold: f32,

    /// Persisted corpus file.
    #[validate(custom(function = "validate_non_empty_path"))]
    pub corpus_path: PathBuf,

    /// Scenario input file.
    #[validate(custom(function = "validate_non_empty_path"))]
    pub scenario_path: PathBuf,
}

impl Default for StepCorpusConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: None,
            model_name: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            corpus_path: PathBuf::from(DEFAULT_CORPUS_PATH),
            scenario_path: PathBuf::from(DEFAULT_SCENARIO_PATH),
        }
    }
}

impl StepCorpusConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` first (non-fatal if `.env` is absent),
    /// then reads each variable from the process environment.
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// `OPENAI_API_KEY` is required; everything else has a default.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let openai_api_key = lookup("OPENAI_API_KEY").ok_or_else(|| {
            crate::StepCorpusError::Validation("OPENAI_API_KEY is required".to_string())
        })?;

        let similarity_threshold = match lookup("STEPCORPUS_SIMILARITY_THRESHOLD") {
            Some(val) => val.trim().parse::<f32>().map_err(|_| {
                crate::StepCorpusError::Validation(
                    "STEPCORPUS_SIMILARITY_THRESHOLD must be a number in [0, 1]".to_string(),
                )
            })?,
            None => defaults.similarity_threshold,
        };

        let config = Self {
            openai_api_key,
            openai_base_url: lookup("OPENAI_BASE_URL").filter(|s| !s.is_empty()),
            model_name: lookup("STEPCORPUS_MODEL").unwrap_or(defaults.model_name),
            embedding_model: lookup("STEPCORPUS_EMBEDDING_MODEL")
                .unwrap_or(defaults.embedding_model),
            similarity_threshold,
            corpus_path: lookup("STEPCORPUS_CORPUS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.corpus_path),
            scenario_path: lookup("STEPCORPUS_SCENARIO_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.scenario_path),
        };

        config.check()?;
        Ok(config)
    }

    /// Run field validation, mapping failures to [`crate::StepCorpusError::Validation`].
    pub fn check(&self) -> crate::Result<()> {
        // `range` compares with `<`/`>`, which NaN passes.
        if !self.similarity_threshold.is_finite() {
            return Err(crate::StepCorpusError::Validation(format!(
                "similarity_threshold must be a number in [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        self.validate()
            .map_err(|e| crate::StepCorpusError::Validation(e.to_string()))
    }
}
