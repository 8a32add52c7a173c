#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

//! Backends for the generation and embedding seams of `lethe_core`.

pub mod command_runner;
mod embedding;
mod ollama;
pub mod retry;

pub use embedding::OllamaEmbedder;
pub use ollama::{OllamaCliProvider, clean_output};
pub use retry::{RetryPolicy, retry_with_backoff};
