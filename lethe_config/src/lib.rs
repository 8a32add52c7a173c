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

mod error;
mod schema;

pub use error::{ConfigError, Result};
pub use schema::{
    ChatConfig, Config, EntitiesConfig, ExtractionConfig, ExtractionStrategy, OllamaConfig,
    ProvidersConfig, load_catalog,
};
