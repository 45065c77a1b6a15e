//! # stepcorpus-rs
//!
//! Turns BDD scenario text into a deduplicated corpus of structured test steps.
//!
//! ## Architecture
//!
//! - **Extraction**: an LLM converts scenario text into `{"steps": [...]}` candidates
//! - **Validation**: the batch is shape-checked as a whole before anything else happens
//! - **Semantic dedup**: candidates whose embedding is within a cosine threshold of an
//!   existing step (or an earlier candidate in the same batch) are dropped
//! - **Corpus store**: ordered, append-only JSON file, rewritten atomically per batch

pub mod errors;
pub mod steps;
pub mod types;

pub mod embedder;
pub mod extractor;
pub mod llm_client;

pub mod corpus;
pub mod matcher;
pub mod prompts;
pub mod validate;

pub mod pipeline;
pub mod utils;

pub use corpus::{CorpusStore, LoadStatus};
pub use errors::{ErrorKind, Result, StepCorpusError};
pub use matcher::{Decision, SimilarityMatcher};
pub use pipeline::{BatchReport, StepPipeline};
pub use steps::{CandidateRecord, StepRecord};
pub use types::StepCorpusConfig;
