//! Persistent corpus of accepted steps.
//!
//! [`CorpusStore`] is the only owner of the step records and of the embedding
//! cache that runs parallel to them: index `i` of the cache always belongs to
//! record `i`. Embeddings are never written to disk; they are regenerated
//! from the `action` text after every load.
//!
//! Writes go to a sibling temporary file which is then renamed over the
//! target, so the corpus file is either the old content or the new content.

use std::{
    io,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tokio::fs;
use tracing::{debug, warn};

use crate::embedder::{EmbedderClient, Embedding};
use crate::errors::{Result, StepCorpusError};
use crate::steps::{StepRecord, StepsDocument};
use crate::utils::text::normalize_whitespace;
use crate::validate::validate_batch;

/// How the store came to hold its initial records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadStatus {
    /// No corpus file existed yet.
    Missing,
    /// The file parsed and validated.
    Loaded { records: usize },
    /// The file was malformed and ignored for this run; it is left untouched
    /// until the next successful save.
    Recovered { reason: String },
    /// Constructed in memory without touching the disk.
    InMemory,
}

pub struct CorpusStore {
    path: PathBuf,
    records: Vec<StepRecord>,
    /// `None` until primed by [`CorpusStore::embeddings`].
    embeddings: Option<Vec<Embedding>>,
    status: LoadStatus,
}

impl CorpusStore {
    /// An empty store that will save to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
            embeddings: None,
            status: LoadStatus::InMemory,
        }
    }

    /// Read the corpus at `path`.
    ///
    /// A missing file yields an empty corpus. Malformed content is logged and
    /// also yields an empty corpus. Any other read failure is an
    /// [`StepCorpusError::Io`] error, because starting empty would let the
    /// next save overwrite data we never saw.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no corpus file; starting empty");
                return Ok(Self::with_status(path, Vec::new(), LoadStatus::Missing));
            }
            Err(e) => return Err(StepCorpusError::io(path.display(), e)),
        };

        match parse_corpus(&path, &bytes) {
            Ok(records) => {
                debug!(path = %path.display(), records = records.len(), "corpus loaded");
                let status = LoadStatus::Loaded {
                    records: records.len(),
                };
                Ok(Self::with_status(path, records, status))
            }
            Err(err) => {
                warn!(error = %err, "ignoring malformed corpus; starting empty");
                let reason = match err {
                    StepCorpusError::CorpusLoad { reason, .. } => reason,
                    other => other.to_string(),
                };
                Ok(Self::with_status(
                    path,
                    Vec::new(),
                    LoadStatus::Recovered { reason },
                ))
            }
        }
    }

    fn with_status(path: PathBuf, records: Vec<StepRecord>, status: LoadStatus) -> Self {
        Self {
            path,
            records,
            embeddings: None,
            status,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Exact-text membership, ignoring whitespace differences.
    pub fn contains_action(&self, action: &str) -> bool {
        let needle = normalize_whitespace(action);
        self.records
            .iter()
            .any(|r| normalize_whitespace(&r.action) == needle)
    }

    /// Embeddings of every record, computed once per load with a single
    /// batch call. The provider is not called for an empty corpus.
    pub async fn embeddings<E: EmbedderClient>(&mut self, embedder: &E) -> Result<&[Embedding]> {
        if self.embeddings.is_none() {
            let vectors = if self.records.is_empty() {
                Vec::new()
            } else {
                let texts: Vec<&str> = self.records.iter().map(|r| r.action.as_str()).collect();
                let vectors = embedder.embed_batch(&texts).await?;
                if vectors.len() != texts.len() {
                    return Err(StepCorpusError::Embedder(format!(
                        "expected {} corpus embeddings, provider returned {}",
                        texts.len(),
                        vectors.len()
                    )));
                }
                debug!(count = vectors.len(), "corpus embeddings computed");
                vectors
            };
            self.embeddings = Some(vectors);
        }
        Ok(self.cached_embeddings())
    }

    /// The embedding cache as it stands; empty until primed.
    pub fn cached_embeddings(&self) -> &[Embedding] {
        self.embeddings.as_deref().unwrap_or(&[])
    }

    /// Add a record in memory. Nothing is written until [`CorpusStore::save`].
    pub fn append(&mut self, record: StepRecord, embedding: Embedding) {
        self.records.push(record);
        // An unprimed cache is rebuilt from every record on next access.
        if let Some(cache) = self.embeddings.as_mut() {
            cache.push(embedding);
        }
    }

    /// Overwrite the corpus file with the in-memory records.
    pub async fn save(&self) -> Result<()> {
        let doc = StepsDocument {
            steps: self.records.clone(),
        };
        let mut body = serde_json::to_string_pretty(&doc)
            .map_err(|e| StepCorpusError::persist(self.path.display(), e.into()))?;
        body.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StepCorpusError::persist(self.path.display(), e))?;
        }

        let tmp = temp_path(&self.path);
        if let Err(e) = fs::write(&tmp, body.as_bytes()).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StepCorpusError::persist(self.path.display(), e));
        }
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StepCorpusError::persist(self.path.display(), e));
        }

        debug!(path = %self.path.display(), records = self.records.len(), "corpus saved");
        Ok(())
    }
}

/// Decode and validate persisted corpus bytes.
fn parse_corpus(path: &Path, bytes: &[u8]) -> Result<Vec<StepRecord>> {
    let malformed = |reason: String| StepCorpusError::CorpusLoad {
        path: path.display().to_string(),
        reason,
    };

    let text = std::str::from_utf8(bytes).map_err(|e| malformed(format!("not UTF-8: {e}")))?;
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| malformed(format!("invalid JSON: {e}")))?;
    let candidates = validate_batch(&value).map_err(|e| malformed(e.to_string()))?;

    Ok(candidates.into_iter().map(|c| c.into_record()).collect())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "corpus".into());
    name.push(".tmp");
    path.with_file_name(name)
}
