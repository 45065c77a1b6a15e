//! Error types for stepcorpus-rs.

use std::fmt;

/// Alias for Results returning [`StepCorpusError`].
pub type Result<T> = std::result::Result<T, StepCorpusError>;

/// Top-level error type for stepcorpus-rs.
#[derive(Debug, thiserror::Error)]
pub enum StepCorpusError {
    /// Extraction output or a candidate step does not have the required shape.
    #[error("Schema error: {0}")]
    Schema(String),

    /// The extraction service failed.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// The embedding service failed or returned an unusable result.
    #[error("Embedder error: {0}")]
    Embedder(String),

    /// The persisted corpus could not be understood. Recovered inside
    /// [`CorpusStore::load`](crate::corpus::CorpusStore::load).
    #[error("Corpus at '{path}' is malformed: {reason}")]
    CorpusLoad { path: String, reason: String },

    /// Writing the updated corpus failed; nothing was committed.
    #[error("Failed to persist corpus to '{path}': {source}")]
    Persist {
        path: String,
        source: std::io::Error,
    },

    #[error("IO error on '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Invalid configuration.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl StepCorpusError {
    /// Create an IO error with a path context.
    pub(crate) fn io(path: impl fmt::Display, source: std::io::Error) -> Self {
        StepCorpusError::Io {
            path: path.to_string(),
            source,
        }
    }

    pub(crate) fn persist(path: impl fmt::Display, source: std::io::Error) -> Self {
        StepCorpusError::Persist {
            path: path.to_string(),
            source,
        }
    }

    /// Coarse classification used in failure reports.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StepCorpusError::Schema(_) => ErrorKind::Schema,
            StepCorpusError::Llm(_) | StepCorpusError::Embedder(_) => ErrorKind::Provider,
            StepCorpusError::CorpusLoad { .. } => ErrorKind::CorpusLoad,
            StepCorpusError::Persist { .. } => ErrorKind::Persist,
            StepCorpusError::Io { .. } => ErrorKind::Io,
            StepCorpusError::Validation(_) => ErrorKind::Config,
        }
    }
}

/// Failure category of a [`StepCorpusError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Schema,
    Provider,
    CorpusLoad,
    Persist,
    Io,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Schema => "schema_error",
            ErrorKind::Provider => "provider_error",
            ErrorKind::CorpusLoad => "corpus_load_error",
            ErrorKind::Persist => "persist_error",
            ErrorKind::Io => "io_error",
            ErrorKind::Config => "config_error",
        };
        f.write_str(name)
    }
}

/// LLM-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Rate limited")]
    RateLimit,

    #[error("Empty response from LLM")]
    EmptyResponse,

    #[error("Authentication failed")]
    Authentication,

    #[error("API error: {message}")]
    Api { message: String },

    #[error("Transport error: {0}")]
    Transport(String),
}
