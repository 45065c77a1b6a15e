//! Vector similarity functions.

use ndarray::ArrayView1;

/// Compute the cosine similarity between two f32 slices.
///
/// Returns `0.0` for empty slices, mismatched lengths, or zero vectors.
/// Returns a value in `[-1.0, 1.0]` for valid non-zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let a = ArrayView1::from(a);
    let b = ArrayView1::from(b);

    let dot = a.dot(&b);
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Highest cosine similarity between `query` and any row of `corpus`.
///
/// Returns `None` when `corpus` is empty.
pub fn max_cosine_similarity<V: AsRef<[f32]>>(query: &[f32], corpus: &[V]) -> Option<f32> {
    corpus
        .iter()
        .map(|row| cosine_similarity(query, row.as_ref()))
        .fold(None, |best, score| match best {
            Some(b) if b >= score => Some(b),
            _ => Some(score),
        })
}
