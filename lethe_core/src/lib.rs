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

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod decision;
pub mod entity;
pub mod error;
pub mod policy;
pub mod util;

pub use decision::{BlockReason, Decision, SensitivityResult, Stage, Verdict};
pub use entity::{AliasRule, EntityCatalog, EntityDef, default_alias_rules};
pub use error::{EngineError, Result};
pub use policy::{EscalationConfig, PolicyConfig, PolicyUpdate};

/// Maps a prompt to generated text.
///
/// Implementations are not session-stateful: every call stands alone.
/// Failures are reported as `Err`, never as a panic.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, prompt: &str, model: &str) -> anyhow::Result<String>;
}

/// Maps text to a fixed-size vector. Deterministic for a fixed model.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Embed several texts at once. The result is index-aligned with `texts`.
    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

#[async_trait]
impl<T: GenerationProvider + ?Sized> GenerationProvider for std::sync::Arc<T> {
    async fn generate(&self, prompt: &str, model: &str) -> anyhow::Result<String> {
        (**self).generate(prompt, model).await
    }
}

#[async_trait]
impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for std::sync::Arc<T> {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        (**self).embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts).await
    }
}

/// One prior message of a conversation, as supplied by the chat boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub is_user: bool,
    pub content: String,
}

impl ChatTurn {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            is_user: true,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            is_user: false,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

/// A per-request diagnostic line returned to the chat boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugLog {
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<ChatTurn>,
    /// Return the request trace alongside the response.
    pub include_logs: bool,
}

impl ChatRequest {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub const fn with_logs(mut self, include_logs: bool) -> Self {
        self.include_logs = include_logs;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_logs: Option<Vec<DebugLog>>,
}
