//! Novelty decision for candidate steps.
//!
//! The matcher is a pure numeric contract over externally supplied vectors:
//! it knows nothing about models or text. A candidate is a duplicate when its
//! best cosine similarity against the corpus reaches the threshold; the
//! threshold itself counts as a match.

use serde::Serialize;

use crate::utils::similarity::max_cosine_similarity;

/// Default similarity at which two steps are considered the same action.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.85;

/// Whether a candidate enters the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
}

/// Result of matching one candidate embedding against the corpus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOutcome {
    pub decision: Decision,
    /// Highest similarity seen, `None` for an empty corpus. Informational only.
    pub best_score: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityMatcher {
    threshold: f32,
}

impl Default for SimilarityMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl SimilarityMatcher {
    /// `threshold` is expected in `[0, 1]`; [`StepCorpusConfig::check`] enforces it.
    ///
    /// A NaN threshold compares false against every score, so every candidate
    /// would be accepted.
    ///
    /// [`StepCorpusConfig::check`]: crate::types::StepCorpusConfig::check
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn evaluate<V: AsRef<[f32]>>(&self, candidate: &[f32], corpus: &[V]) -> MatchOutcome {
        let best_score = max_cosine_similarity(candidate, corpus);
        let decision = match best_score {
            Some(score) if score >= self.threshold => Decision::Reject,
            _ => Decision::Accept,
        };
        MatchOutcome {
            decision,
            best_score,
        }
    }

    pub fn decide<V: AsRef<[f32]>>(&self, candidate: &[f32], corpus: &[V]) -> Decision {
        self.evaluate(candidate, corpus).decision
    }
}
