//! Wires config into providers and the policy engine.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use lethe_config::{Config, ExtractionStrategy};
use lethe_core::PolicyConfig;
use lethe_engine::{DynamicExtractor, EntityExtractor, PolicyEngine, StaticExtractor};
use lethe_providers::{OllamaCliProvider, OllamaEmbedder};
use tracing::info;

pub type Engine = PolicyEngine<OllamaCliProvider, OllamaEmbedder>;

/// Components shared by commands that talk to the engine.
pub struct Components {
    pub config: Config,
    pub config_path: PathBuf,
    pub engine: Engine,
}

impl Components {
    /// Load `~/lethe/config.json` and build the engine it describes.
    /// A `model` override applies to this process only.
    pub fn load(model: Option<String>) -> anyhow::Result<Self> {
        let config_path = Config::default_path()?;
        let config = Config::load_from(&config_path)?;
        info!("Loaded config from {}", config_path.display());

        let engine = match model {
            Some(model) => {
                let mut effective = config.clone();
                effective.policy.model_name = model;
                build_engine(&effective)?
            }
            None => build_engine(&config)?,
        };
        Ok(Self {
            config,
            config_path,
            engine,
        })
    }

    /// Persist callback for [`PolicyEngine::update_config`]: writes the new
    /// policy into the config file, leaving other sections as loaded.
    pub fn persist_policy(&self) -> impl FnOnce(&PolicyConfig) -> anyhow::Result<()> + use<> {
        let mut config = self.config.clone();
        let path = self.config_path.clone();
        move |policy| {
            config.policy = policy.clone();
            config.save_to(&path)?;
            info!("Saved policy to {}", path.display());
            Ok(())
        }
    }
}

pub fn build_engine(config: &Config) -> anyhow::Result<Engine> {
    let ollama = &config.providers.ollama;
    let generator = Arc::new(
        OllamaCliProvider::new()
            .with_program(&ollama.program)
            .with_timeout(Duration::from_secs(ollama.timeout_secs)),
    );
    let embedder = Arc::new(OllamaEmbedder::new(
        &ollama.embedding_url,
        &ollama.embedding_model,
    ));

    let extractor: Box<dyn EntityExtractor> = match config.extraction.strategy {
        ExtractionStrategy::Static => {
            Box::new(StaticExtractor::new(config.extraction.rules.clone()))
        }
        ExtractionStrategy::Dynamic => Box::new(DynamicExtractor::new(
            Arc::clone(&generator),
            config.extraction_model(),
        )),
    };
    info!("Entity extraction: {:?}", config.extraction.strategy);

    let catalog = config.entity_catalog()?;
    Ok(
        PolicyEngine::new(generator, embedder, extractor, config.policy.clone())
            .with_catalog(catalog)
            .with_history_limit(config.chat.history_limit),
    )
}
