//! Derives the canonical entity name and its aliases from an ingested document.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use lethe_core::{AliasRule, EngineError, GenerationProvider, Result, default_alias_rules};
use tracing::{info, warn};

/// Output of an [`EntityExtractor`]. When `aliases` is non-empty its first
/// element equals `canonical_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntity {
    pub canonical_name: String,
    pub aliases: Vec<String>,
}

impl ExtractedEntity {
    /// Build from a canonical name and raw aliases; the name is put first and
    /// duplicates are dropped case-insensitively.
    #[must_use]
    pub fn new<I, S>(canonical_name: &str, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let canonical_name = canonical_name.trim().to_string();
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for alias in std::iter::once(canonical_name.clone())
            .chain(aliases.into_iter().map(|a| a.as_ref().trim().to_string()))
        {
            if !alias.is_empty() && seen.insert(alias.to_lowercase()) {
                out.push(alias);
            }
        }
        Self {
            canonical_name,
            aliases: out,
        }
    }
}

#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract(&self, content: &str, source_name: &str) -> Result<ExtractedEntity>;
}

/// Fixed lookup keyed by a substring of the source name.
pub struct StaticExtractor {
    rules: Vec<AliasRule>,
}

impl StaticExtractor {
    #[must_use]
    pub const fn new(rules: Vec<AliasRule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(default_alias_rules())
    }
}

impl Default for StaticExtractor {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[async_trait]
impl EntityExtractor for StaticExtractor {
    async fn extract(&self, _content: &str, source_name: &str) -> Result<ExtractedEntity> {
        let Some(rule) = self
            .rules
            .iter()
            .find(|r| r.matches(source_name) && !r.aliases.is_empty())
        else {
            warn!("No alias rule matches source {}; no aliases registered", source_name);
            return Ok(ExtractedEntity {
                canonical_name: source_stem(source_name),
                aliases: Vec::new(),
            });
        };

        let entity = ExtractedEntity::new(&rule.aliases[0], &rule.aliases[1..]);
        info!(
            "Static rule '{}' matched {}: {} aliases",
            rule.pattern,
            source_name,
            entity.aliases.len()
        );
        Ok(entity)
    }
}

/// Asks the generation backend for the dominant entity and its aliases.
pub struct DynamicExtractor<G: ?Sized> {
    generator: Arc<G>,
    model: String,
    max_content_chars: usize,
}

impl<G> DynamicExtractor<G>
where
    G: GenerationProvider + ?Sized,
{
    pub fn new(generator: Arc<G>, model: impl Into<String>) -> Self {
        Self {
            generator,
            model: model.into(),
            max_content_chars: 4000,
        }
    }

    #[must_use]
    pub const fn with_max_content_chars(mut self, max: usize) -> Self {
        self.max_content_chars = max;
        self
    }

    fn excerpt<'a>(&self, content: &'a str) -> &'a str {
        content
            .char_indices()
            .nth(self.max_content_chars)
            .map_or(content, |(idx, _)| &content[..idx])
    }
}

#[async_trait]
impl<G> EntityExtractor for DynamicExtractor<G>
where
    G: GenerationProvider + ?Sized,
{
    async fn extract(&self, content: &str, source_name: &str) -> Result<ExtractedEntity> {
        let excerpt = self.excerpt(content);

        let name_prompt = format!(
            "Identify the single main person, character, or entity that the following text is about. \
             Reply with the name only, no explanation.\n\nTEXT:\n{excerpt}\n\nNAME:"
        );
        let raw_name = self
            .generator
            .generate(&name_prompt, &self.model)
            .await
            .map_err(|e| EngineError::ingestion(source_name, format!("entity naming failed: {e}")))?;
        let canonical = clean_entity_name(&raw_name);
        if canonical.is_empty() {
            return Err(EngineError::ingestion(
                source_name,
                "entity naming returned nothing",
            ));
        }

        let alias_prompt = format!(
            "List every name, nickname, title, or alias used for {canonical}, including ones that \
             appear in the text below. Reply with one comma-separated list and nothing else.\n\n\
             TEXT:\n{excerpt}\n\nALIASES:"
        );
        let entity = match self.generator.generate(&alias_prompt, &self.model).await {
            Ok(raw) => parse_alias_list(&raw, &canonical),
            Err(e) => {
                warn!("Alias enumeration failed for {}: {e}", canonical);
                ExtractedEntity::new(&canonical, std::iter::empty::<&str>())
            }
        };

        info!(
            "Extracted entity '{}' from {} with {} aliases",
            entity.canonical_name,
            source_name,
            entity.aliases.len()
        );
        Ok(entity)
    }
}

/// First meaningful line of a naming reply, without labels or quotes.
#[must_use]
pub fn clean_entity_name(raw: &str) -> String {
    let line = raw
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    let line = line
        .strip_prefix("NAME:")
        .or_else(|| line.strip_prefix("Name:"))
        .unwrap_or(line);
    clean_alias(line)
}

/// Parse a comma-separated alias reply into an entity rooted at `canonical`.
#[must_use]
pub fn parse_alias_list(raw: &str, canonical: &str) -> ExtractedEntity {
    let body = raw
        .trim()
        .strip_prefix("ALIASES:")
        .unwrap_or_else(|| raw.trim());
    let aliases = body
        .split([',', '\n', ';'])
        .map(clean_alias)
        .filter(|a| !a.is_empty() && a.chars().count() <= 60);
    ExtractedEntity::new(canonical, aliases)
}

fn clean_alias(raw: &str) -> String {
    let trimmed = raw
        .trim()
        .trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '-' | '*' | '•' | ')'))
        .trim_start_matches(['.', ' '])
        .trim_end_matches(['.', ' '])
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '“' | '”'))
        .trim();
    trimmed.to_string()
}

/// File name without directory or extension, used as a display fallback.
fn source_stem(source_name: &str) -> String {
    Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(source_name)
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays queued replies in order and records every prompt.
    struct ScriptedGenerator {
        replies: Mutex<VecDeque<anyhow::Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<anyhow::Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerationProvider for ScriptedGenerator {
        async fn generate(&self, prompt: &str, _model: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted reply left")))
        }
    }

    #[test]
    fn canonical_name_comes_first_once() {
        let entity = ExtractedEntity::new("Peter Parker", ["spider-man", "PETER PARKER", " "]);
        assert_eq!(entity.aliases, vec!["Peter Parker", "spider-man"]);
    }

    #[test]
    fn parses_comma_separated_reply() {
        let entity = parse_alias_list(
            "ALIASES: Spider-Man, \"Spidey\", Peter Parker, 1. web-slinger.",
            "Peter Parker",
        );
        assert_eq!(entity.canonical_name, "Peter Parker");
        assert_eq!(
            entity.aliases,
            vec!["Peter Parker", "Spider-Man", "Spidey", "web-slinger"]
        );
    }

    #[test]
    fn cleans_name_reply() {
        assert_eq!(clean_entity_name("\n  Name: \"Sherlock Holmes\".\nextra"), "Sherlock Holmes");
        assert_eq!(clean_entity_name("   "), "");
    }

    #[tokio::test]
    async fn static_rule_matches_source_name() {
        let extractor = StaticExtractor::with_defaults();
        let entity = extractor
            .extract("anything", "uploads/SPIDERMAN_notes.txt")
            .await
            .unwrap();
        assert_eq!(entity.canonical_name, "Spider-Man");
        assert_eq!(entity.aliases[0], "Spider-Man");
        assert!(entity.aliases.iter().any(|a| a == "Peter Parker"));
    }

    #[tokio::test]
    async fn static_no_match_yields_empty_aliases() {
        let extractor = StaticExtractor::with_defaults();
        let entity = extractor.extract("text", "docs/weather.md").await.unwrap();
        assert_eq!(entity.canonical_name, "weather");
        assert!(entity.aliases.is_empty());
    }

    #[tokio::test]
    async fn dynamic_names_then_lists_aliases() {
        let generator = ScriptedGenerator::new(vec![
            Ok("Name: Peter Parker".to_string()),
            Ok("ALIASES: Spider-Man, Spidey, peter parker".to_string()),
        ]);
        let extractor = DynamicExtractor::new(Arc::clone(&generator), "llama3");

        let entity = extractor
            .extract("Peter Parker was bitten by a spider.", "notes.txt")
            .await
            .expect("Failed to extract entity");

        assert_eq!(entity.canonical_name, "Peter Parker");
        assert_eq!(entity.aliases, vec!["Peter Parker", "Spider-Man", "Spidey"]);
        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].ends_with("NAME:"));
        assert!(prompts[1].contains("Peter Parker"));
        assert!(prompts[1].ends_with("ALIASES:"));
    }

    #[tokio::test]
    async fn dynamic_naming_failure_is_ingestion_error() {
        let generator = ScriptedGenerator::new(vec![Err(anyhow::anyhow!("backend down"))]);
        let extractor = DynamicExtractor::new(Arc::clone(&generator), "llama3");

        let err = extractor
            .extract("Peter Parker was bitten by a spider.", "notes.txt")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Ingestion { ref source_name, .. } if source_name == "notes.txt"
        ));
        assert_eq!(generator.prompts().len(), 1);
    }

    #[tokio::test]
    async fn dynamic_blank_name_is_ingestion_error() {
        let generator = ScriptedGenerator::new(vec![Ok("  \n ".to_string())]);
        let extractor = DynamicExtractor::new(Arc::clone(&generator), "llama3");

        let result = extractor.extract("text", "notes.txt").await;

        assert!(matches!(result, Err(EngineError::Ingestion { .. })));
        assert_eq!(generator.prompts().len(), 1);
    }

    #[tokio::test]
    async fn dynamic_alias_failure_keeps_canonical_only() {
        let generator = ScriptedGenerator::new(vec![
            Ok("Peter Parker".to_string()),
            Err(anyhow::anyhow!("timed out")),
        ]);
        let extractor = DynamicExtractor::new(Arc::clone(&generator), "llama3");

        let entity = extractor
            .extract("Peter Parker was bitten by a spider.", "notes.txt")
            .await
            .expect("Failed to extract entity");

        assert_eq!(entity.canonical_name, "Peter Parker");
        assert_eq!(entity.aliases, vec!["Peter Parker"]);
        assert_eq!(generator.prompts().len(), 2);
    }

    #[tokio::test]
    async fn dynamic_prompt_uses_bounded_excerpt() {
        let generator = ScriptedGenerator::new(vec![
            Ok("Zed".to_string()),
            Ok("Zed".to_string()),
        ]);
        let extractor =
            DynamicExtractor::new(Arc::clone(&generator), "llama3").with_max_content_chars(4);

        extractor
            .extract("abcdefgh", "notes.txt")
            .await
            .expect("Failed to extract entity");

        let prompts = generator.prompts();
        assert!(prompts[0].contains("TEXT:\nabcd\n"));
        assert!(!prompts[0].contains("abcde"));
    }
}
