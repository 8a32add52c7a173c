use std::fmt::Write as _;
use std::sync::{Arc, RwLock};

use lethe_core::{
    ChatRequest, ChatResponse, ChatTurn, Decision, EmbeddingProvider, EngineError, EntityCatalog,
    GenerationProvider, PolicyConfig, PolicyUpdate, Result, SensitivityResult,
};
use tracing::info;

use crate::extractor::EntityExtractor;
use crate::patterns::{DEFAULT_DETECTOR, InterrogativeDetector};
use crate::pipeline::{EvalContext, Pipeline};
use crate::rewriter::ResponseRewriter;
use crate::scorer::SensitivityScorer;
use crate::store::{ForgettingItem, ForgettingStore, ItemId};
use crate::trace::RequestTrace;

const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Owns the forgetting store and the live policy config, and answers chat
/// requests through the pipeline the config selects.
pub struct PolicyEngine<G: ?Sized, E: ?Sized> {
    store: ForgettingStore<E>,
    generator: Arc<G>,
    scorer: SensitivityScorer<E>,
    rewriter: ResponseRewriter,
    detector: Option<InterrogativeDetector>,
    catalog: RwLock<Arc<EntityCatalog>>,
    config: RwLock<Arc<PolicyConfig>>,
    history_limit: usize,
}

impl<G, E> PolicyEngine<G, E>
where
    G: GenerationProvider + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    pub fn new(
        generator: Arc<G>,
        embedder: Arc<E>,
        extractor: Box<dyn EntityExtractor>,
        config: PolicyConfig,
    ) -> Self {
        Self {
            store: ForgettingStore::new(Arc::clone(&embedder), extractor),
            generator,
            scorer: SensitivityScorer::new(embedder),
            rewriter: ResponseRewriter::default(),
            detector: None,
            catalog: RwLock::new(Arc::new(EntityCatalog::default())),
            config: RwLock::new(Arc::new(config)),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    #[must_use]
    pub fn with_catalog(self, catalog: EntityCatalog) -> Self {
        self.set_catalog(catalog);
        self
    }

    #[must_use]
    pub const fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    #[must_use]
    pub fn with_detector(mut self, detector: InterrogativeDetector) -> Self {
        self.detector = Some(detector);
        self
    }

    #[must_use]
    pub fn with_rewriter(mut self, rewriter: ResponseRewriter) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub const fn store(&self) -> &ForgettingStore<E> {
        &self.store
    }

    fn detector(&self) -> &InterrogativeDetector {
        self.detector.as_ref().unwrap_or(&*DEFAULT_DETECTOR)
    }

    /// Snapshot of the live policy config.
    pub fn config(&self) -> Arc<PolicyConfig> {
        let guard = match self.config.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(&guard)
    }

    /// Validate `update`, hand the result to `persist`, then make it live.
    ///
    /// When validation or `persist` fails the previous config stays in effect.
    pub fn update_config<F>(&self, update: &PolicyUpdate, persist: F) -> Result<PolicyConfig>
    where
        F: FnOnce(&PolicyConfig) -> anyhow::Result<()>,
    {
        let mut guard = match self.config.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = guard.with_update(update)?;
        persist(&next).map_err(EngineError::ConfigPersistence)?;
        *guard = Arc::new(next.clone());
        info!(
            "Policy updated: retain_mode={}, check_before_llm={}, threshold={:.2}, use_entities={}, model={}",
            next.retain_mode,
            next.check_before_llm,
            next.similarity_threshold,
            next.use_entities,
            next.model_name
        );
        Ok(next)
    }

    pub fn catalog(&self) -> Arc<EntityCatalog> {
        let guard = match self.catalog.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(&guard)
    }

    pub fn set_catalog(&self, catalog: EntityCatalog) {
        let mut guard = match self.catalog.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        info!("Entity catalog loaded with {} entities", catalog.len());
        *guard = Arc::new(catalog);
    }

    pub async fn ingest(&self, content: &str, source_name: &str) -> Result<ItemId> {
        self.store.add(content, source_name).await
    }

    pub async fn remove(&self, id: ItemId) -> Result<ForgettingItem> {
        self.store.remove(id).await
    }

    pub fn items(&self) -> Vec<ForgettingItem> {
        self.store.snapshot().items().to_vec()
    }

    /// Score `text` against the forgetting set at the configured threshold.
    pub async fn score(&self, text: &str) -> Result<SensitivityResult> {
        let threshold = self.config().similarity_threshold;
        let snapshot = self.store.snapshot();
        self.scorer.score(&snapshot, text, threshold).await
    }

    /// Decide what to show for `query` given the preceding conversation.
    pub async fn evaluate(&self, query: &str, history: &[ChatTurn]) -> (Decision, RequestTrace) {
        let mut trace = RequestTrace::new();
        let config = self.config();
        let snapshot = self.store.snapshot();
        let catalog = self.catalog();
        let prompt = build_prompt(query, history, self.history_limit);

        let ctx = EvalContext {
            config: &config,
            snapshot: &snapshot,
            catalog: &catalog,
            generator: self.generator.as_ref(),
            scorer: &self.scorer,
            rewriter: &self.rewriter,
            detector: self.detector(),
        };
        let decision = Pipeline::select(&config)
            .evaluate(&ctx, query, &prompt, &mut trace)
            .await;
        (decision, trace)
    }

    pub async fn chat(&self, request: &ChatRequest) -> ChatResponse {
        let (decision, trace) = self.evaluate(&request.message, &request.history).await;
        ChatResponse {
            verdict: decision.verdict(),
            response: decision.into_text(),
            debug_logs: request.include_logs.then(|| trace.into_logs()),
        }
    }
}

/// Render the last `limit` turns of `history` followed by `message`.
///
/// Without history the message is sent as is.
#[must_use]
pub fn build_prompt(message: &str, history: &[ChatTurn], limit: usize) -> String {
    let start = history.len().saturating_sub(limit);
    let recent = &history[start..];
    if recent.is_empty() {
        return message.to_string();
    }

    let mut prompt = String::new();
    for turn in recent {
        let role = if turn.is_user { "User" } else { "Assistant" };
        let _ = writeln!(prompt, "{role}: {}", turn.content.trim());
    }
    let _ = write!(prompt, "User: {}\nAssistant:", message.trim());
    prompt
}
