//! Rewrites generated text so it no longer names forgotten entities.

use lethe_core::GenerationProvider;
use tracing::{debug, warn};

/// Instruction fragments a backend tends to echo back.
pub const ECHO_MARKERS: [&str; 3] = ["RULES:", "TEXT TO REWRITE:", "Note:"];

const OUTPUT_LABEL: &str = "REWRITTEN TEXT:";

pub struct ResponseRewriter {
    markers: Vec<String>,
}

impl Default for ResponseRewriter {
    fn default() -> Self {
        Self::new(ECHO_MARKERS.iter().map(|m| (*m).to_string()).collect())
    }
}

impl ResponseRewriter {
    #[must_use]
    pub const fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }

    #[must_use]
    pub fn build_prompt(text: &str, entities: &[String]) -> String {
        let names = entities.join(", ");
        format!(
            "You are an editor. Rewrite the text below so that it no longer mentions these \
             entities: {names}.\n\n\
             RULES:\n\
             1. Remove every sentence or clause that refers to the entities above, by any name, \
             nickname, or title.\n\
             2. Do not replace them with pronouns, descriptions, or hints.\n\
             3. Keep all other information exactly as it is.\n\
             4. Preserve paragraphs, lists, and formatting of the remaining text.\n\
             5. Output only the rewritten text with no commentary.\n\n\
             EXAMPLE:\n\
             Entities: Bruce Wayne, Batman\n\
             Input: Gotham is a large city. Bruce Wayne protects it at night as Batman. \
             The city has a busy harbor.\n\
             Output: Gotham is a large city. The city has a busy harbor.\n\n\
             TEXT TO REWRITE:\n{text}\n\n{OUTPUT_LABEL}"
        )
    }

    /// Ask `generator` for a version of `text` without `entities`.
    ///
    /// The reply is returned after echo stripping, without checking that the
    /// entities are actually gone.
    pub async fn rewrite<G>(
        &self,
        generator: &G,
        text: &str,
        entities: &[String],
        model: &str,
    ) -> anyhow::Result<String>
    where
        G: GenerationProvider + ?Sized,
    {
        let prompt = Self::build_prompt(text, entities);
        let raw = generator.generate(&prompt, model).await?;
        let cleaned = self.strip_echo(&raw);
        if cleaned.is_empty() {
            warn!("Rewrite returned empty text");
        }
        debug!("Rewrote {} chars into {}", text.len(), cleaned.len());
        Ok(cleaned)
    }

    /// Cut `raw` at the earliest echo marker and drop a leading output label.
    #[must_use]
    pub fn strip_echo(&self, raw: &str) -> String {
        let body = raw.trim_start();
        let body = body.strip_prefix(OUTPUT_LABEL).unwrap_or(body);
        let cut = self
            .markers
            .iter()
            .filter(|m| !m.is_empty())
            .filter_map(|m| body.find(m.as_str()))
            .min()
            .unwrap_or(body.len());
        body[..cut].trim().to_string()
    }
}
