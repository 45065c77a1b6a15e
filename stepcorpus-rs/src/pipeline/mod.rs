//! Scenario ingestion pipeline.
//!
//! One batch moves through these stages in order:
//! 1. **LoadingCorpus** - read the persisted corpus (empty on missing/malformed)
//! 2. **Extracting** - extraction service turns scenario text into JSON
//! 3. **Validating** - the whole batch must pass [`validate_batch`]
//! 4. **EmbeddingCandidates** - corpus cache primed, candidates embedded
//! 5. **Matching** - each candidate judged against the corpus *as extended by
//!    earlier accepts in this batch*
//! 6. **Appending** - accepted candidates added in batch order
//! 7. **Persisting** - the corpus file is rewritten atomically
//!
//! Any failure ends the run in `Failed` with nothing saved.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::corpus::{CorpusStore, LoadStatus};
use crate::embedder::{EmbedderClient, Embedding};
use crate::errors::{Result, StepCorpusError};
use crate::extractor::StepExtractor;
use crate::matcher::{Decision, SimilarityMatcher};
use crate::steps::{CandidateRecord, StepRecord};
use crate::validate::validate_batch;

/// Pipeline state-machine stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    LoadingCorpus,
    Extracting,
    Validating,
    EmbeddingCandidates,
    Matching,
    Appending,
    Persisting,
    Done,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::LoadingCorpus => "loading_corpus",
            PipelineStage::Extracting => "extracting",
            PipelineStage::Validating => "validating",
            PipelineStage::EmbeddingCandidates => "embedding_candidates",
            PipelineStage::Matching => "matching",
            PipelineStage::Appending => "appending",
            PipelineStage::Persisting => "persisting",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Accept/reject split of one batch, in batch order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub accepted: Vec<StepRecord>,
    pub rejected: Vec<StepRecord>,
}

/// Summary of a committed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub accepted: usize,
    pub rejected: usize,
    pub corpus_size: usize,
    pub corpus_path: PathBuf,
    pub load_status: LoadStatus,
    pub accepted_steps: Vec<StepRecord>,
    pub rejected_steps: Vec<StepRecord>,
}

/// Orchestrates extraction, validation, embedding, matching and persistence.
///
/// Collaborators are injected so tests can substitute fakes.
pub struct StepPipeline<X, E> {
    extractor: X,
    embedder: E,
    matcher: SimilarityMatcher,
}

impl<X: StepExtractor, E: EmbedderClient> StepPipeline<X, E> {
    pub fn new(extractor: X, embedder: E, matcher: SimilarityMatcher) -> Self {
        Self {
            extractor,
            embedder,
            matcher,
        }
    }

    pub fn matcher(&self) -> &SimilarityMatcher {
        &self.matcher
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Run one scenario batch against the corpus at `corpus_path`.
    ///
    /// Either every accepted step is saved or nothing is.
    pub async fn run(&self, scenario: &str, corpus_path: impl Into<PathBuf>) -> Result<BatchReport> {
        let mut tracker = StageTracker::default();

        tracker.enter(PipelineStage::LoadingCorpus);
        let mut store = tracker.guard(CorpusStore::load(corpus_path).await)?;

        tracker.enter(PipelineStage::Extracting);
        let extracted = tracker.guard(self.extractor.extract(scenario).await)?;

        tracker.enter(PipelineStage::Validating);
        let candidates = tracker.guard(validate_batch(&extracted))?;
        debug!(candidates = candidates.len(), "batch validated");

        let outcome = self.ingest_tracked(candidates, &mut store, &mut tracker).await?;

        tracker.enter(PipelineStage::Persisting);
        tracker.guard(store.save().await)?;
        tracker.enter(PipelineStage::Done);

        let report = BatchReport {
            accepted: outcome.accepted.len(),
            rejected: outcome.rejected.len(),
            corpus_size: store.len(),
            corpus_path: store.path().to_path_buf(),
            load_status: store.status().clone(),
            accepted_steps: outcome.accepted,
            rejected_steps: outcome.rejected,
        };
        info!(
            accepted = report.accepted,
            rejected = report.rejected,
            corpus_size = report.corpus_size,
            "batch committed"
        );
        Ok(report)
    }

    /// Embed, match and append `candidates` into an already loaded store.
    ///
    /// The store is not saved; callers decide when to persist.
    pub async fn ingest(
        &self,
        candidates: Vec<CandidateRecord>,
        store: &mut CorpusStore,
    ) -> Result<BatchOutcome> {
        let mut tracker = StageTracker::default();
        self.ingest_tracked(candidates, store, &mut tracker).await
    }

    async fn ingest_tracked(
        &self,
        candidates: Vec<CandidateRecord>,
        store: &mut CorpusStore,
        tracker: &mut StageTracker,
    ) -> Result<BatchOutcome> {
        tracker.enter(PipelineStage::EmbeddingCandidates);
        tracker.guard(store.embeddings(&self.embedder).await.map(|_| ()))?;
        let vectors = tracker.guard(self.embed_candidates(&candidates).await)?;
        tracker.guard(check_dimensions(store.cached_embeddings(), &vectors))?;

        tracker.enter(PipelineStage::Matching);
        let mut decided = Vec::with_capacity(candidates.len());
        for (candidate, embedding) in candidates.into_iter().zip(vectors) {
            let decision = if store.contains_action(candidate.action()) {
                debug!(step = candidate.action(), "exact duplicate");
                Decision::Reject
            } else {
                let outcome = self.matcher.evaluate(&embedding, store.cached_embeddings());
                debug!(
                    step = candidate.action(),
                    best_score = ?outcome.best_score,
                    decision = ?outcome.decision,
                    "candidate matched"
                );
                outcome.decision
            };

            // Accepting extends the comparison set for the rest of the batch.
            if decision == Decision::Accept {
                store.append(candidate.record().clone(), embedding);
            }
            decided.push((candidate.into_record(), decision));
        }

        tracker.enter(PipelineStage::Appending);
        let mut outcome = BatchOutcome::default();
        for (record, decision) in decided {
            match decision {
                Decision::Accept => outcome.accepted.push(record),
                Decision::Reject => outcome.rejected.push(record),
            }
        }
        Ok(outcome)
    }

    async fn embed_candidates(&self, candidates: &[CandidateRecord]) -> Result<Vec<Embedding>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let texts: Vec<&str> = candidates.iter().map(|c| c.action()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(StepCorpusError::Embedder(format!(
                "expected {} candidate embeddings, provider returned {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

/// Read a scenario file fully into memory as UTF-8.
pub async fn read_scenario(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| StepCorpusError::io(path.display(), e))?;
    String::from_utf8(bytes).map_err(|e| {
        StepCorpusError::io(
            path.display(),
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        )
    })
}

/// Every vector in the batch must share the corpus dimension.
fn check_dimensions(corpus: &[Embedding], candidates: &[Embedding]) -> Result<()> {
    let Some(dim) = corpus.first().or_else(|| candidates.first()).map(Vec::len) else {
        return Ok(());
    };
    match candidates.iter().position(|v| v.len() != dim) {
        Some(idx) => Err(StepCorpusError::Embedder(format!(
            "embedding dimension mismatch: expected {}, candidate {} has {}",
            dim,
            idx,
            candidates[idx].len()
        ))),
        None => Ok(()),
    }
}

/// Records the current stage so failures can be attributed.
#[derive(Debug)]
struct StageTracker {
    stage: PipelineStage,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self {
            stage: PipelineStage::LoadingCorpus,
        }
    }
}

impl StageTracker {
    fn enter(&mut self, stage: PipelineStage) {
        debug!(stage = %stage, "pipeline stage");
        self.stage = stage;
    }

    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        result.map_err(|err| {
            warn!(stage = %self.stage, kind = %err.kind(), error = %err, "pipeline failed");
            self.stage = PipelineStage::Failed;
            err
        })
    }
}
