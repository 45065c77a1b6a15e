//! OpenAI LLM client implementation.
//!
//! Uses `async-openai` for API calls, `moka` for response caching, and
//! `backoff` for exponential-backoff retry on rate limits / transient errors.

use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use moka::future::Cache;
use serde_json::json;
use tracing::{debug, warn};

use crate::errors::{LlmError, Result, StepCorpusError};

use super::{LlmClient, Message, Role};

/// Default chat model used for step extraction.
pub const DEFAULT_MODEL: &str = "gpt-4o";

// ── Cache configuration ───────────────────────────────────────────────────────

/// Configuration for the in-process response cache.
///
/// A one-shot run sends a single request, so hits only happen when one client
/// (usually inside a long-lived [`StepPipeline`](crate::StepPipeline)) sees the
/// same scenario again.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries held in memory.
    pub max_capacity: u64,
    /// How long each entry lives before eviction.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 256,
            ttl: Duration::from_secs(3_600), // 1 hour
        }
    }
}

// ── Client struct ─────────────────────────────────────────────────────────────

/// OpenAI LLM client implementing [`LlmClient`].
pub struct OpenAiClient {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    /// Keyed by `md5(model + messages)` → response text.
    cache: Cache<String, String>,
}

impl OpenAiClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `api_key` – OpenAI secret key.
    /// * `model`   – Model name (e.g. `"gpt-4o"`).
    /// * `cache_config` – Cache capacity and TTL.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        cache_config: CacheConfig,
    ) -> Self {
        let config = async_openai::config::OpenAIConfig::new().with_api_key(api_key);
        Self::from_config(config, model.into(), cache_config)
    }

    /// Create a client against an OpenAI-compatible base URL.
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        cache_config: CacheConfig,
    ) -> Self {
        let config = async_openai::config::OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);
        Self::from_config(config, model.into(), cache_config)
    }

    fn from_config(
        config: async_openai::config::OpenAIConfig,
        model: String,
        cache_config: CacheConfig,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(cache_config.max_capacity)
            .time_to_live(cache_config.ttl)
            .build();

        Self {
            client: async_openai::Client::with_config(config),
            model,
            // Extraction must be reproducible for the same scenario.
            temperature: 0.0,
            max_tokens: 8_192,
            cache,
        }
    }

    /// Override the sampling temperature (default `0.0`).
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Override the max output token limit (default `8192`).
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Compute an MD5 cache key from model + message sequence.
    fn cache_key(&self, messages: &[Message]) -> String {
        use md5::{Digest, Md5};
        let mut h = Md5::new();
        h.update(self.model.as_bytes());
        for m in messages {
            h.update(role_str(&m.role).as_bytes());
            h.update([0u8]);
            h.update(m.content.as_bytes());
            h.update([0u8]);
        }
        format!("{:x}", h.finalize())
    }

    fn messages_to_json(messages: &[Message]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|m| {
                json!({
                    "role": role_str(&m.role),
                    "content": m.content,
                })
            })
            .collect()
    }

    /// Call the chat completions endpoint with exponential-backoff retry.
    ///
    /// Retries on [`LlmError::RateLimit`] and transport failures.
    async fn call_with_retry(&self, request: serde_json::Value) -> Result<serde_json::Value> {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_max_interval(Duration::from_secs(30))
            .with_max_elapsed_time(Some(Duration::from_secs(120)))
            .build();

        backoff::future::retry(backoff, || async {
            let outcome: std::result::Result<serde_json::Value, async_openai::error::OpenAIError> =
                self.client.chat().create_byot(request.clone()).await;

            match outcome {
                Ok(response) => Ok(response),
                Err(e) => {
                    let llm_err = map_openai_error(e);
                    match &llm_err {
                        LlmError::RateLimit => {
                            warn!("OpenAI rate limit hit, retrying with backoff");
                            Err(backoff::Error::transient(llm_err))
                        }
                        LlmError::Transport(msg) => {
                            warn!("OpenAI transport error ({}), retrying", msg);
                            Err(backoff::Error::transient(llm_err))
                        }
                        _ => Err(backoff::Error::permanent(llm_err)),
                    }
                }
            }
        })
        .await
        .map_err(StepCorpusError::Llm)
    }

    /// Extract the assistant message text from a chat-completions response.
    fn extract_content(response: &serde_json::Value) -> Result<String> {
        response["choices"][0]["message"]["content"]
            .as_str()
            .filter(|s| !s.trim().is_empty())
            .map(ToOwned::to_owned)
            .ok_or(StepCorpusError::Llm(LlmError::EmptyResponse))
    }
}

// ── LlmClient implementation ──────────────────────────────────────────────────

impl LlmClient for OpenAiClient {
    async fn generate(&self, messages: &[Message]) -> Result<String> {
        let key = self.cache_key(messages);

        if let Some(cached) = self.cache.get(&key).await {
            debug!("LLM cache hit");
            return Ok(cached);
        }

        let request = json!({
            "model": self.model,
            "messages": Self::messages_to_json(messages),
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let response = self.call_with_retry(request).await?;
        let content = Self::extract_content(&response)?;

        self.cache.insert(key, content.clone()).await;

        Ok(content)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn role_str(role: &Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Map an [`async_openai::error::OpenAIError`] to our [`LlmError`] domain type.
fn map_openai_error(err: async_openai::error::OpenAIError) -> LlmError {
    use async_openai::error::OpenAIError;

    match err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or_default();
            let kind = api_err.r#type.as_deref().unwrap_or_default();
            match (code, kind) {
                ("invalid_api_key", _) | (_, "authentication_error") => LlmError::Authentication,
                ("rate_limit_exceeded", _) | (_, "requests") => LlmError::RateLimit,
                _ => LlmError::Api {
                    message: api_err.message,
                },
            }
        }
        OpenAIError::Reqwest(e) if e.is_timeout() || e.is_connect() => {
            LlmError::Transport(e.to_string())
        }
        other => LlmError::Api {
            message: other.to_string(),
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
