use std::sync::Arc;

use lethe_core::{EmbeddingProvider, EngineError, Result, SensitivityResult};
use tracing::debug;

use crate::scoring::max_similarity;
use crate::store::StoreSnapshot;

/// Scores text by its nearest statement in the forgetting set.
pub struct SensitivityScorer<E: ?Sized> {
    embedder: Arc<E>,
}

impl<E> SensitivityScorer<E>
where
    E: EmbeddingProvider + ?Sized,
{
    pub const fn new(embedder: Arc<E>) -> Self {
        Self { embedder }
    }

    /// Max cosine similarity of `text` against `snapshot`.
    ///
    /// An empty forgetting set is never sensitive and costs no embedding call.
    pub async fn score(
        &self,
        snapshot: &StoreSnapshot,
        text: &str,
        threshold: f64,
    ) -> Result<SensitivityResult> {
        if snapshot.is_empty() {
            return Ok(SensitivityResult::CLEAR);
        }

        let query = self
            .embedder
            .embed(text)
            .await
            .map_err(EngineError::Embedding)?;
        let score = max_similarity(&query, snapshot.embeddings());
        debug!("Similarity {:.3} against {} statements", score, snapshot.embeddings().len());
        Ok(SensitivityResult::from_score(score, threshold))
    }

    /// Like [`Self::score`], but only when `text` mentions a known alias.
    ///
    /// A store with no registered aliases falls back to plain scoring.
    pub async fn score_gated(
        &self,
        snapshot: &StoreSnapshot,
        text: &str,
        threshold: f64,
    ) -> Result<SensitivityResult> {
        if snapshot.has_aliases() && snapshot.find_alias(text).is_none() {
            debug!("No alias mentioned; skipping similarity scoring");
            return Ok(SensitivityResult::CLEAR);
        }
        self.score(snapshot, text, threshold).await
    }
}
