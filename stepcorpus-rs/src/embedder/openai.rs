//! OpenAI embedding client implementation.
//!
//! Wraps [`async_openai`] to provide [`EmbedderClient`] for the OpenAI
//! Embeddings API, with chunked batch support and exponential-backoff retry.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::CreateEmbeddingRequestArgs,
    Client,
};
use backoff::{future::retry, ExponentialBackoffBuilder};
use std::time::Duration;
use tracing::{debug, warn};

use crate::embedder::{Embedding, EmbedderClient};
use crate::errors::{Result, StepCorpusError};

/// Default embedding model name.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Maximum number of inputs per OpenAI embeddings API call.
const BATCH_CHUNK_SIZE: usize = 2048;

/// Return the embedding dimension for a given model name.
///
/// Falls back to 1536 (the `text-embedding-3-small` dimension) for
/// unrecognised models.
fn model_dim(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

/// Classify an [`OpenAIError`] as transient (should retry) or permanent.
fn classify_error(err: OpenAIError) -> backoff::Error<StepCorpusError> {
    let msg = err.to_string();
    match &err {
        // Timeouts and refused connections are worth another attempt.
        OpenAIError::Reqwest(e) if e.is_timeout() || e.is_connect() => {
            warn!("embedding request failed transiently, retrying: {}", msg);
            backoff::Error::transient(StepCorpusError::Embedder(msg))
        }
        _ => backoff::Error::permanent(StepCorpusError::Embedder(msg)),
    }
}

/// OpenAI embedding client that implements [`EmbedderClient`].
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dim: usize,
}

impl OpenAiEmbedder {
    /// Create a new embedder against the public OpenAI endpoint.
    ///
    /// # Arguments
    /// * `api_key` – OpenAI API key (`sk-…`).
    /// * `model`   – Embedding model name (e.g. [`DEFAULT_MODEL`]).
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::from_config(OpenAIConfig::new().with_api_key(api_key.into()), model.into())
    }

    /// Create a new embedder pointing at an OpenAI-compatible base URL
    /// (proxies, Azure gateways, local servers, or a mock in tests).
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key.into())
            .with_api_base(base_url.into());
        Self::from_config(config, model.into())
    }

    fn from_config(config: OpenAIConfig, model: String) -> Self {
        let dim = model_dim(&model);
        Self {
            client: Client::with_config(config),
            model,
            dim,
        }
    }

    /// Issue a single embeddings API call for up to [`BATCH_CHUNK_SIZE`] texts.
    ///
    /// Retries on transient network failures with exponential back-off
    /// (initial 500 ms, cap 10 s, total budget 60 s). Results are returned in
    /// input order regardless of the order the API lists them in.
    async fn embed_chunk(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let backoff_policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_max_interval(Duration::from_secs(10))
            .with_max_elapsed_time(Some(Duration::from_secs(60)))
            .build();

        let input: Vec<String> = texts.iter().map(|s| (*s).to_owned()).collect();
        let expected = input.len();
        let model = self.model.clone();
        let client = self.client.clone();

        let mut items = retry(backoff_policy, move || {
            let input = input.clone();
            let model = model.clone();
            let client = client.clone();
            async move {
                let request = CreateEmbeddingRequestArgs::default()
                    .model(model.as_str())
                    .input(input)
                    .build()
                    .map_err(|e| {
                        backoff::Error::permanent(StepCorpusError::Embedder(e.to_string()))
                    })?;

                let response = client
                    .embeddings()
                    .create(request)
                    .await
                    .map_err(classify_error)?;

                Ok::<_, backoff::Error<StepCorpusError>>(response.data)
            }
        })
        .await?;

        if items.len() != expected {
            return Err(StepCorpusError::Embedder(format!(
                "expected {} embeddings, API returned {}",
                expected,
                items.len()
            )));
        }

        items.sort_by_key(|item| item.index);
        debug!(count = expected, model = %self.model, "embedded chunk");

        Ok(items
            .into_iter()
            .map(|item| item.embedding.into_iter().map(|x| x as f32).collect())
            .collect())
    }
}

impl EmbedderClient for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut embeddings = self.embed_chunk(&[text]).await?;
        embeddings
            .pop()
            .ok_or_else(|| StepCorpusError::Embedder("empty response from embedding API".to_string()))
    }

    /// Embed multiple texts, automatically splitting into chunks of at most
    /// [`BATCH_CHUNK_SIZE`] items to respect OpenAI's per-call limits.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut result = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_CHUNK_SIZE) {
            let chunk_embeddings = self.embed_chunk(chunk).await?;
            result.extend(chunk_embeddings);
        }
        Ok(result)
    }

    fn dim(&self) -> usize {
        self.dim
    }
}
