//! Step records: the unit of the corpus.

use serde::{Deserialize, Serialize};

/// One accepted test action.
///
/// Serialized as `{"step": .., "capture": .., "page": ..}`; `page` is omitted
/// entirely when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Concise, lowercase, imperative description of a single action.
    #[serde(rename = "step")]
    pub action: String,
    /// Whether this step's output is captured during execution.
    pub capture: bool,
    /// Screen/page the step operates on or navigates to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
}

impl StepRecord {
    pub fn new(action: impl Into<String>, capture: bool) -> Self {
        Self {
            action: action.into(),
            capture,
            page: None,
        }
    }

    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }
}

/// A validated step that has not been admitted to the corpus yet.
///
/// Only [`crate::validate`] constructs these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord(StepRecord);

impl CandidateRecord {
    pub(crate) fn new(record: StepRecord) -> Self {
        Self(record)
    }

    pub fn action(&self) -> &str {
        &self.0.action
    }

    pub fn record(&self) -> &StepRecord {
        &self.0
    }

    /// Admit the candidate, yielding the corpus record.
    pub fn into_record(self) -> StepRecord {
        self.0
    }
}

/// Top-level shape of the persisted corpus file and of extraction output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepsDocument {
    pub steps: Vec<StepRecord>,
}
