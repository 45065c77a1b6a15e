//! Extraction service abstraction.
//!
//! An extractor turns raw scenario text into an untrusted JSON value that
//! should look like `{"steps": [...]}`. It does not validate the shape;
//! [`crate::validate::validate_batch`] does that.

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, StepCorpusError};
use crate::llm_client::LlmClient;
use crate::prompts::extract_steps;
use crate::utils::text::{extract_json_from_response, truncate_with_ellipsis};

/// Trait for scenario-to-steps extraction services.
#[allow(async_fn_in_trait)]
pub trait StepExtractor: Send + Sync {
    async fn extract(&self, scenario: &str) -> Result<Value>;
}

/// Extractor backed by a chat LLM and the BDD-to-JSON prompt.
pub struct LlmStepExtractor<C> {
    client: C,
}

impl<C: LlmClient> LlmStepExtractor<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C: LlmClient> StepExtractor for LlmStepExtractor<C> {
    async fn extract(&self, scenario: &str) -> Result<Value> {
        let reply = self.client.generate(&extract_steps::messages(scenario)).await?;
        debug!(reply = %truncate_with_ellipsis(&reply, 200), "extraction reply");
        parse_reply(&reply)
    }
}

/// Strip chatter around the JSON payload and parse it.
fn parse_reply(reply: &str) -> Result<Value> {
    let json = extract_json_from_response(reply)
        .ok_or_else(|| StepCorpusError::Schema("no JSON found in extraction reply".to_string()))?;
    serde_json::from_str(json).map_err(|e| StepCorpusError::Schema(format!("invalid JSON: {e}")))
}
