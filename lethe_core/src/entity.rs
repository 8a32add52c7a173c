//! Curated entity exclusion list used by entity mode.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDef {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl EntityDef {
    #[must_use]
    pub fn new(name: impl Into<String>, aliases: Vec<String>) -> Self {
        Self {
            name: name.into(),
            aliases,
        }
    }

    /// Name followed by every non-empty alias.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str())
            .chain(self.aliases.iter().map(String::as_str))
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCatalog {
    #[serde(default)]
    pub entities: Vec<EntityDef>,
}

impl EntityCatalog {
    #[must_use]
    pub const fn new(entities: Vec<EntityDef>) -> Self {
        Self { entities }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// First entity whose name or alias occurs in `text` (case-insensitive).
    #[must_use]
    pub fn find_mention(&self, text: &str) -> Option<&EntityDef> {
        let lower = text.to_lowercase();
        self.entities.iter().find(|entity| {
            entity
                .terms()
                .any(|term| lower.contains(&term.to_lowercase()))
        })
    }
}

/// Static extraction rule: a source name containing `pattern`
/// (case-insensitive) yields `aliases`, canonical name first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRule {
    pub pattern: String,
    pub aliases: Vec<String>,
}

impl AliasRule {
    #[must_use]
    pub fn new(pattern: impl Into<String>, aliases: &[&str]) -> Self {
        Self {
            pattern: pattern.into(),
            aliases: aliases.iter().map(|a| (*a).to_string()).collect(),
        }
    }

    #[must_use]
    pub fn matches(&self, source_name: &str) -> bool {
        !self.pattern.is_empty()
            && source_name
                .to_lowercase()
                .contains(&self.pattern.to_lowercase())
    }
}

/// Built-in rules shipped with the default config.
#[must_use]
pub fn default_alias_rules() -> Vec<AliasRule> {
    vec![
        AliasRule::new(
            "spider",
            &[
                "Spider-Man",
                "Peter Parker",
                "Spiderman",
                "Spider Man",
                "Spidey",
                "web-slinger",
                "Peter Benjamin Parker",
            ],
        ),
        AliasRule::new(
            "potter",
            &[
                "Harry Potter",
                "Harry James Potter",
                "The Boy Who Lived",
                "The Chosen One",
            ],
        ),
        AliasRule::new(
            "holmes",
            &[
                "Sherlock Holmes",
                "Sherlock",
                "Mr. Holmes",
                "the great detective",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mention_matches_alias_case_insensitively() {
        let catalog = EntityCatalog::new(vec![EntityDef::new(
            "Harry Potter",
            vec!["The Boy Who Lived".to_string()],
        )]);
        let hit = catalog.find_mention("tell me about the boy who lived");
        assert_eq!(hit.map(|e| e.name.as_str()), Some("Harry Potter"));
        assert!(catalog.find_mention("tell me about dragons").is_none());
    }

    #[test]
    fn rule_matches_source_substring() {
        let rules = default_alias_rules();
        let rule = rules.iter().find(|r| r.matches("Spider-Man_Facts.txt")).unwrap();
        assert_eq!(rule.aliases[0], "Spider-Man");
        assert!(!AliasRule::new("", &["x"]).matches("anything"));
    }

    #[test]
    fn blank_aliases_never_match() {
        let catalog =
            EntityCatalog::new(vec![EntityDef::new("Voldemort", vec!["  ".to_string()])]);
        assert!(catalog.find_mention("anything at all").is_none());
    }
}
