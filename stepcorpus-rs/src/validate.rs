//! Shape validation for extracted steps.
//!
//! Extraction output is untrusted JSON. Nothing reaches the dedup stage until
//! [`validate_batch`] has accepted the whole batch; one bad element rejects
//! all of it.

use serde_json::Value;

use crate::errors::{Result, StepCorpusError};
use crate::steps::{CandidateRecord, StepRecord};

/// Validate a single extracted step object.
pub fn validate_candidate(value: &Value) -> Result<CandidateRecord> {
    let obj = value
        .as_object()
        .ok_or_else(|| schema("step must be a JSON object"))?;

    let action = match obj.get("step") {
        None => return Err(schema("each step must have 'step' and 'capture' keys")),
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) => return Err(schema("'step' must not be empty")),
        Some(_) => return Err(schema("'step' must be a string")),
    };

    let capture = match obj.get("capture") {
        None => return Err(schema("each step must have 'step' and 'capture' keys")),
        Some(Value::Bool(b)) => *b,
        Some(_) => return Err(schema("'capture' must be a boolean")),
    };

    let page = match obj.get("page") {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(schema("'page' must be a string when present")),
    };

    Ok(CandidateRecord::new(StepRecord {
        action,
        capture,
        page,
    }))
}

/// Validate a whole `{"steps": [...]}` document.
///
/// The wrapper and the element types are checked before any element is
/// validated, so a structurally broken batch never yields partial results.
pub fn validate_batch(value: &Value) -> Result<Vec<CandidateRecord>> {
    let steps = value
        .as_object()
        .and_then(|obj| obj.get("steps"))
        .ok_or_else(|| schema("JSON must have a 'steps' key"))?
        .as_array()
        .ok_or_else(|| schema("'steps' must be an array"))?;

    if let Some(idx) = steps.iter().position(|s| !s.is_object()) {
        return Err(schema(format!("steps[{idx}] is not an object")));
    }

    steps
        .iter()
        .enumerate()
        .map(|(idx, step)| {
            validate_candidate(step).map_err(|e| match e {
                StepCorpusError::Schema(msg) => schema(format!("steps[{idx}]: {msg}")),
                other => other,
            })
        })
        .collect()
}

fn schema(msg: impl Into<String>) -> StepCorpusError {
    StepCorpusError::Schema(msg.into())
}
