//! Outcome types of the decision policy.

use serde::{Deserialize, Serialize};

/// Result of scoring a text against the forgetting set. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityResult {
    pub is_sensitive: bool,
    pub score: f64,
}

impl SensitivityResult {
    pub const CLEAR: Self = Self {
        is_sensitive: false,
        score: 0.0,
    };

    /// Strict comparison: a score equal to the threshold is not sensitive.
    #[must_use]
    pub fn from_score(score: f64, threshold: f64) -> Self {
        Self {
            is_sensitive: score > threshold,
            score,
        }
    }
}

/// Pipeline position of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    PromptChecked,
    Generated,
    ResponseChecked,
}

impl Stage {
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Received => "received",
            Self::PromptChecked => "prompt_checked",
            Self::Generated => "generated",
            Self::ResponseChecked => "response_checked",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Allowed,
    Blocked,
    Rewritten,
}

/// Why a request ended in `Blocked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// Query names a forgotten entity and asks about it.
    DirectEntity,
    /// Query scored above the similarity threshold before generation.
    PromptSensitive,
    /// Generated text mentions a forgotten entity or scores above threshold.
    ResponseSensitive,
    /// Generated text is near-verbatim forgotten content.
    Escalation,
    /// Generated text is mostly about a forgotten entity.
    EntityFocus,
    /// Query names an entity from the exclusion catalog.
    EntityMode,
    /// An excluded entity survived the post-filter.
    ResidualEntity,
    /// Scoring could not complete.
    ScoringFailed,
    /// The rewrite backend call failed.
    RewriteFailed,
}

/// Terminal state of one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Output passes through. `generation_failed` marks the fixed error text.
    Allowed {
        response: String,
        generation_failed: bool,
    },
    Blocked {
        reason: BlockReason,
        message: String,
    },
    Rewritten {
        original: String,
        response: String,
    },
}

impl Decision {
    #[must_use]
    pub fn allowed(response: impl Into<String>) -> Self {
        Self::Allowed {
            response: response.into(),
            generation_failed: false,
        }
    }

    #[must_use]
    pub fn blocked(reason: BlockReason, message: impl Into<String>) -> Self {
        Self::Blocked {
            reason,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn verdict(&self) -> Verdict {
        match self {
            Self::Allowed { .. } => Verdict::Allowed,
            Self::Blocked { .. } => Verdict::Blocked,
            Self::Rewritten { .. } => Verdict::Rewritten,
        }
    }

    /// Text shown to the user.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Allowed { response, .. } | Self::Rewritten { response, .. } => response,
            Self::Blocked { message, .. } => message,
        }
    }

    #[must_use]
    pub const fn block_reason(&self) -> Option<BlockReason> {
        match self {
            Self::Blocked { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Allowed { response, .. } | Self::Rewritten { response, .. } => response,
            Self::Blocked { message, .. } => message,
        }
    }
}
