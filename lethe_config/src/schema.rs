use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use lethe_core::{AliasRule, EntityCatalog, PolicyConfig, default_alias_rules};

use crate::error::{ConfigError, Result};

const CONFIG_DIR_NAME: &str = "lethe";
const CONFIG_FILE_NAME: &str = "config.json";
const ENTITIES_FILE_NAME: &str = "entities.json";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub entities: EntitiesConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub ollama: OllamaConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OllamaConfig {
    /// CLI used for generation.
    #[serde(default = "OllamaConfig::default_program")]
    pub program: String,
    #[serde(default = "OllamaConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "OllamaConfig::default_embedding_url")]
    pub embedding_url: String,
    #[serde(default = "OllamaConfig::default_embedding_model")]
    pub embedding_model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            program: Self::default_program(),
            timeout_secs: Self::default_timeout_secs(),
            embedding_url: Self::default_embedding_url(),
            embedding_model: Self::default_embedding_model(),
        }
    }
}

impl OllamaConfig {
    fn default_program() -> String {
        "ollama".to_string()
    }

    const fn default_timeout_secs() -> u64 {
        120
    }

    fn default_embedding_url() -> String {
        "http://localhost:11434".to_string()
    }

    fn default_embedding_model() -> String {
        "all-minilm".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStrategy {
    #[default]
    Static,
    Dynamic,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub strategy: ExtractionStrategy,
    /// Model for dynamic extraction; falls back to `policy.model_name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default = "default_alias_rules")]
    pub rules: Vec<AliasRule>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strategy: ExtractionStrategy::default(),
            model: None,
            rules: default_alias_rules(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct EntitiesConfig {
    /// Entity catalog file; defaults to `~/lethe/entities.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChatConfig {
    /// Prior turns rendered into the prompt.
    #[serde(default = "ChatConfig::default_history_limit")]
    pub history_limit: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: Self::default_history_limit(),
        }
    }
}

impl ChatConfig {
    const fn default_history_limit() -> usize {
        10
    }
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_DIR_NAME))
            .ok_or(ConfigError::NoHomeDir)
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Read a config file. The similarity threshold is normalized on load.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let mut config: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::parse(path, e))?;

        let raw = config.policy.similarity_threshold;
        config.policy = config.policy.normalized();
        if (raw - config.policy.similarity_threshold).abs() > f64::EPSILON {
            info!(
                "Normalized similarity_threshold {} -> {}",
                raw, config.policy.similarity_threshold
            );
        }

        Ok(config)
    }

    /// Write atomically: temp file in the same directory, then rename.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| ConfigError::io(dir, e))?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::parse(path, e))?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content).map_err(|e| ConfigError::io(&tmp_path, e))?;
        std::fs::rename(&tmp_path, path).map_err(|e| ConfigError::io(path, e))?;
        Ok(())
    }

    pub fn ensure_config_dir() -> Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::io(&config_dir, e))?;
        Ok(config_dir)
    }

    pub fn create_config() -> Result<PathBuf> {
        let config_dir = Self::ensure_config_dir()?;
        Self::create_config_in(&config_dir)
    }

    /// Write the default config into `dir`. Refuses to overwrite.
    pub fn create_config_in(dir: &Path) -> Result<PathBuf> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Err(ConfigError::AlreadyExists(config_path));
        }
        Self::default().save_to(&config_path)?;

        let entities_path = dir.join(ENTITIES_FILE_NAME);
        if !entities_path.exists() {
            let content = serde_json::to_string_pretty(&EntityCatalog::default())
                .map_err(|e| ConfigError::parse(&entities_path, e))?;
            std::fs::write(&entities_path, content)
                .map_err(|e| ConfigError::io(&entities_path, e))?;
        }

        Ok(config_path)
    }

    /// Resolved location of the entity catalog.
    pub fn entities_path(&self) -> Result<PathBuf> {
        match &self.entities.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join(ENTITIES_FILE_NAME)),
        }
    }

    /// Load the entity catalog; a missing file yields an empty catalog.
    pub fn entity_catalog(&self) -> Result<EntityCatalog> {
        load_catalog(&self.entities_path()?)
    }

    /// Model used by dynamic extraction.
    #[must_use]
    pub fn extraction_model(&self) -> &str {
        self.extraction
            .model
            .as_deref()
            .unwrap_or(&self.policy.model_name)
    }
}

pub fn load_catalog(path: &Path) -> Result<EntityCatalog> {
    if !path.exists() {
        warn!(
            "Entity catalog not found at {}; entity mode has nothing to exclude",
            path.display()
        );
        return Ok(EntityCatalog::default());
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    let catalog: EntityCatalog =
        serde_json::from_str(&content).map_err(|e| ConfigError::parse(path, e))?;
    info!(
        "Loaded {} entities from {}",
        catalog.entities.len(),
        path.display()
    );
    Ok(catalog)
}
