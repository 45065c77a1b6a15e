//! Shared utilities.
//!
//! Includes:
//! - Vector similarity (cosine over `ndarray` views)
//! - Text helpers for LLM replies and step comparison

pub mod similarity;
pub mod text;

pub use similarity::{cosine_similarity, max_cosine_similarity};
pub use text::{extract_json_from_response, normalize_whitespace, truncate_with_ellipsis};
