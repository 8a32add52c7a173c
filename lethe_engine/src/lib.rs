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

pub mod context;
mod engine;
pub mod extractor;
pub mod patterns;
pub mod pipeline;
pub mod rewriter;
mod scorer;
mod scoring;
mod store;
mod trace;

pub use context::{EntityScan, MIN_CONTEXT_WORDS};
pub use engine::{PolicyEngine, build_prompt};
pub use extractor::{DynamicExtractor, EntityExtractor, ExtractedEntity, StaticExtractor};
pub use patterns::{InterrogativeDetector, InterrogativePattern, TermMatcher};
pub use pipeline::Pipeline;
pub use rewriter::ResponseRewriter;
pub use scorer::SensitivityScorer;
pub use scoring::{cosine_similarity, max_similarity};
pub use store::{ForgettingItem, ForgettingStore, ItemId, StoreSnapshot, split_statements};
pub use trace::RequestTrace;
