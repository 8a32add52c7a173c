//! The forgetting store: forgotten documents, their statements, embeddings and
//! entity aliases.
//!
//! Readers take an `Arc<StoreSnapshot>` and never observe a half-built state.
//! Writers are serialized by an async gate, build the next snapshot (including
//! the full re-embed) and publish it with a single pointer swap. Entity
//! extraction runs before the gate is taken, since it may call the generation
//! backend.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

use lethe_core::{EmbeddingProvider, EngineError, Result};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::extractor::EntityExtractor;
use crate::patterns::find_term;

/// Stable identifier of a forgetting item. Assigned monotonically, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId(pub u64);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ForgettingItem {
    pub id: ItemId,
    pub source_name: String,
    pub raw_content: String,
    pub statements: Vec<String>,
}

/// Consistent view of the store.
///
/// `statements` and `embeddings` are index-aligned; both are empty together.
#[derive(Debug, Default)]
pub struct StoreSnapshot {
    items: Vec<ForgettingItem>,
    statements: Vec<String>,
    embeddings: Vec<Vec<f32>>,
    aliases: BTreeMap<String, Vec<String>>,
}

impl StoreSnapshot {
    #[must_use]
    pub fn items(&self) -> &[ForgettingItem] {
        &self.items
    }

    /// The forgetting set: statements of all live items, first occurrence kept.
    #[must_use]
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    #[must_use]
    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    /// Source name to aliases, canonical name first.
    #[must_use]
    pub const fn alias_table(&self) -> &BTreeMap<String, Vec<String>> {
        &self.aliases
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Non-empty alias groups, one per registered entity.
    pub fn alias_groups(&self) -> impl Iterator<Item = &[String]> {
        self.aliases
            .values()
            .filter(|a| !a.is_empty())
            .map(Vec::as_slice)
    }

    #[must_use]
    pub fn has_aliases(&self) -> bool {
        self.alias_groups().next().is_some()
    }

    /// First known alias that `text` mentions.
    #[must_use]
    pub fn find_alias(&self, text: &str) -> Option<&str> {
        find_term(text, self.alias_groups().flatten().map(String::as_str))
    }
}

pub struct ForgettingStore<E: ?Sized> {
    embedder: Arc<E>,
    extractor: Box<dyn EntityExtractor>,
    published: RwLock<Arc<StoreSnapshot>>,
    /// Serializes writers and holds the next item id.
    writer: Mutex<u64>,
}

impl<E> ForgettingStore<E>
where
    E: EmbeddingProvider + ?Sized,
{
    pub fn new(embedder: Arc<E>, extractor: Box<dyn EntityExtractor>) -> Self {
        Self {
            embedder,
            extractor,
            published: RwLock::new(Arc::new(StoreSnapshot::default())),
            writer: Mutex::new(0),
        }
    }

    /// Current consistent view.
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        let guard = match self.published.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(&guard)
    }

    fn publish(&self, next: StoreSnapshot) {
        let mut guard = match self.published.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::new(next);
    }

    pub fn len(&self) -> usize {
        self.snapshot().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().items.is_empty()
    }

    /// Ingest a document. Each non-empty trimmed line becomes a statement.
    ///
    /// Fails without touching the store when the content is blank, when
    /// extraction fails, or when the re-embed fails.
    #[tracing::instrument(skip(self, content))]
    pub async fn add(&self, content: &str, source_name: &str) -> Result<ItemId> {
        let statements = split_statements(content);
        if statements.is_empty() {
            return Err(EngineError::ingestion(source_name, "content is empty"));
        }

        let entity = self.extractor.extract(content, source_name).await?;

        let mut next_id = self.writer.lock().await;
        let current = self.snapshot();

        let id = ItemId(*next_id);
        let mut items = current.items.clone();
        items.push(ForgettingItem {
            id,
            source_name: source_name.to_string(),
            raw_content: content.to_string(),
            statements,
        });

        let mut aliases = current.aliases.clone();
        if aliases
            .insert(source_name.to_string(), entity.aliases)
            .is_some()
        {
            warn!("Alias entry for {} replaced by newer upload", source_name);
        }

        let next = self.rebuild(items, aliases).await?;
        let total = next.statements.len();
        self.publish(next);
        *next_id += 1;

        info!(
            "Added forgetting item {} from {} ({} statements in set)",
            id, source_name, total
        );
        Ok(id)
    }

    /// Remove an item by id. Statements still owned by another item stay.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, id: ItemId) -> Result<ForgettingItem> {
        let _gate = self.writer.lock().await;
        let current = self.snapshot();

        let Some(position) = current.items.iter().position(|item| item.id == id) else {
            warn!("Remove requested for unknown item {}", id);
            return Err(EngineError::UnknownItem(id.0));
        };

        let mut items = current.items.clone();
        let removed = items.remove(position);

        let mut aliases = current.aliases.clone();
        if !items.iter().any(|item| item.source_name == removed.source_name) {
            aliases.remove(&removed.source_name);
        }

        let next = self.rebuild(items, aliases).await?;
        let total = next.statements.len();
        self.publish(next);

        info!(
            "Removed forgetting item {} ({}); {} statements remain",
            id, removed.source_name, total
        );
        Ok(removed)
    }

    /// Derive the forgetting set from `items` and embed all of it.
    async fn rebuild(
        &self,
        items: Vec<ForgettingItem>,
        aliases: BTreeMap<String, Vec<String>>,
    ) -> Result<StoreSnapshot> {
        let mut seen = HashSet::new();
        let statements: Vec<String> = items
            .iter()
            .flat_map(|item| item.statements.iter())
            .filter(|s| seen.insert(s.as_str()))
            .cloned()
            .collect();

        let embeddings = if statements.is_empty() {
            Vec::new()
        } else {
            debug!("Re-embedding {} statements", statements.len());
            let rows = self
                .embedder
                .embed_batch(&statements)
                .await
                .map_err(EngineError::Embedding)?;
            if rows.len() != statements.len() {
                return Err(EngineError::Embedding(anyhow::anyhow!(
                    "expected {} embeddings, got {}",
                    statements.len(),
                    rows.len()
                )));
            }
            rows
        };

        Ok(StoreSnapshot {
            items,
            statements,
            embeddings,
            aliases,
        })
    }
}

/// Non-empty, trimmed lines of `content`, duplicates removed in order.
#[must_use]
pub fn split_statements(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && seen.insert(*line))
        .map(ToOwned::to_owned)
        .collect()
}
