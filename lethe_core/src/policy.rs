use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Thresholds used by the retain pipeline after generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Similarity above which output is blocked outright.
    #[serde(default = "EscalationConfig::default_block_similarity")]
    pub block_similarity: f64,
    /// Similarity bound combined with `focus_ratio`.
    #[serde(default = "EscalationConfig::default_focus_similarity")]
    pub focus_similarity: f64,
    /// Fraction of entity-contextual sentences combined with `focus_similarity`.
    #[serde(default = "EscalationConfig::default_focus_ratio")]
    pub focus_ratio: f64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            block_similarity: Self::default_block_similarity(),
            focus_similarity: Self::default_focus_similarity(),
            focus_ratio: Self::default_focus_ratio(),
        }
    }
}

impl EscalationConfig {
    const fn default_block_similarity() -> f64 {
        0.9
    }

    const fn default_focus_similarity() -> f64 {
        0.7
    }

    const fn default_focus_ratio() -> f64 {
        0.5
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub retain_mode: bool,
    #[serde(default = "PolicyConfig::default_check_before_llm")]
    pub check_before_llm: bool,
    #[serde(default = "PolicyConfig::default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default)]
    pub use_entities: bool,
    #[serde(default = "PolicyConfig::default_model_name")]
    pub model_name: String,
    #[serde(default)]
    pub escalation: EscalationConfig,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            retain_mode: false,
            check_before_llm: Self::default_check_before_llm(),
            similarity_threshold: Self::default_similarity_threshold(),
            use_entities: false,
            model_name: Self::default_model_name(),
            escalation: EscalationConfig::default(),
        }
    }
}

impl PolicyConfig {
    const fn default_check_before_llm() -> bool {
        true
    }

    const fn default_similarity_threshold() -> f64 {
        0.7
    }

    fn default_model_name() -> String {
        "llama3.2".to_string()
    }

    /// Clamp the threshold into [0, 1] and round it to two decimals.
    ///
    /// Applied whenever a config is loaded from durable storage.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.similarity_threshold = normalize_threshold(self.similarity_threshold);
        self
    }

    /// Apply `update` to a copy of this config.
    ///
    /// The receiver is left untouched when the update is rejected.
    pub fn with_update(&self, update: &PolicyUpdate) -> Result<Self, EngineError> {
        let mut next = self.clone();
        if let Some(v) = update.retain_mode {
            next.retain_mode = v;
        }
        if let Some(v) = update.check_before_llm {
            next.check_before_llm = v;
        }
        if let Some(v) = update.similarity_threshold {
            if !(0.0..=1.0).contains(&v) {
                return Err(EngineError::InvalidConfig(format!(
                    "similarity_threshold must be within [0, 1], got {v}"
                )));
            }
            next.similarity_threshold = normalize_threshold(v);
        }
        if let Some(v) = update.use_entities {
            next.use_entities = v;
        }
        if let Some(ref v) = update.model_name {
            if v.trim().is_empty() {
                return Err(EngineError::InvalidConfig(
                    "model_name must not be empty".to_string(),
                ));
            }
            next.model_name = v.trim().to_string();
        }
        Ok(next)
    }
}

/// Partial update of [`PolicyConfig`]. `None` fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyUpdate {
    pub retain_mode: Option<bool>,
    pub check_before_llm: Option<bool>,
    pub similarity_threshold: Option<f64>,
    pub use_entities: Option<bool>,
    pub model_name: Option<String>,
}

impl PolicyUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.retain_mode.is_none()
            && self.check_before_llm.is_none()
            && self.similarity_threshold.is_none()
            && self.use_entities.is_none()
            && self.model_name.is_none()
    }
}

fn normalize_threshold(value: f64) -> f64 {
    if value.is_nan() {
        return PolicyConfig::default_similarity_threshold();
    }
    (value.clamp(0.0, 1.0) * 100.0).round() / 100.0
}
