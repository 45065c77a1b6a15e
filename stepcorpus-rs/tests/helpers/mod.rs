#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
};

use serde_json::Value;
use tempfile::TempDir;

use stepcorpus_rs::embedder::{EmbedderClient, Embedding};
use stepcorpus_rs::errors::{LlmError, Result, StepCorpusError};
use stepcorpus_rs::extractor::StepExtractor;

/// Extraction service that returns a fixed value, or fails.
pub struct FakeExtractor {
    reply: Option<Value>,
}

impl FakeExtractor {
    pub fn returning(reply: Value) -> Self {
        Self { reply: Some(reply) }
    }

    pub fn failing() -> Self {
        Self { reply: None }
    }
}

impl StepExtractor for FakeExtractor {
    async fn extract(&self, _scenario: &str) -> Result<Value> {
        self.reply.clone().ok_or(StepCorpusError::Llm(LlmError::Api {
            message: "service unavailable".to_string(),
        }))
    }
}

/// Embedding provider backed by a fixed text → vector table.
///
/// Unknown text is a provider error, so a test never silently compares
/// against an accidental vector.
pub struct TableEmbedder {
    table: HashMap<String, Embedding>,
    fail: bool,
    pub batch_calls: AtomicUsize,
}

impl TableEmbedder {
    pub fn new(entries: Vec<(&str, Vec<f32>)>) -> Self {
        Self {
            table: entries
                .into_iter()
                .map(|(text, v)| (text.to_string(), v))
                .collect(),
            fail: false,
            batch_calls: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            table: HashMap::new(),
            fail: true,
            batch_calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }
}

impl EmbedderClient for TableEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        if self.fail {
            return Err(StepCorpusError::Embedder("connection refused".to_string()));
        }
        self.table
            .get(text)
            .cloned()
            .ok_or_else(|| StepCorpusError::Embedder(format!("no vector for '{text}'")))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dim(&self) -> usize {
        self.table.values().next().map(Vec::len).unwrap_or(0)
    }
}

/// Temporary directory holding a corpus file.
pub struct TempCorpus {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl TempCorpus {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("output.json");
        Self { dir, path }
    }

    /// Seed the corpus file with raw content.
    pub fn write(&self, content: &str) -> &Self {
        std::fs::write(&self.path, content).expect("write corpus file");
        self
    }

    pub fn read(&self) -> String {
        std::fs::read_to_string(&self.path).expect("read corpus file")
    }

    pub fn read_json(&self) -> Value {
        serde_json::from_str(&self.read()).expect("corpus file is JSON")
    }

    pub fn actions(&self) -> Vec<String> {
        self.read_json()["steps"]
            .as_array()
            .expect("steps array")
            .iter()
            .map(|s| s["step"].as_str().expect("step string").to_string())
            .collect()
    }
}
