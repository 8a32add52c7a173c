use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Ingestion failed for {source_name}: {reason}")]
    Ingestion { source_name: String, reason: String },

    #[error("Embedding failed: {0}")]
    Embedding(anyhow::Error),

    #[error("Config persistence failed: {0}")]
    ConfigPersistence(anyhow::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("No forgetting item with id {0}")]
    UnknownItem(u64),
}

impl EngineError {
    pub fn ingestion(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Ingestion {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}
