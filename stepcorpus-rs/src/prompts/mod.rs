//! Prompt templates for LLM interactions.
//!
//! Prompts are stored as Rust string literals (not external files) for
//! compile-time inclusion and zero-cost access.

pub mod extract_steps;
