//! Per-entity sentence scan of generated text.

use crate::patterns::{TermMatcher, split_units};
use crate::store::StoreSnapshot;

/// Words besides the alias a unit needs before it counts as contextual.
pub const MIN_CONTEXT_WORDS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMentions {
    pub canonical: String,
    pub aliases: Vec<String>,
    /// Units that mention an alias and say something about it.
    pub contextual_units: usize,
    /// Units that mention an alias at all.
    pub mentioned_units: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityScan {
    pub total_units: usize,
    pub entities: Vec<EntityMentions>,
}

impl EntityScan {
    /// Scan `text` against every alias group in `snapshot`.
    #[must_use]
    pub fn scan(snapshot: &StoreSnapshot, text: &str) -> Self {
        Self::scan_groups(snapshot.alias_groups(), text)
    }

    /// Scan `text` against each alias group. Aliases match as whole words.
    #[must_use]
    pub fn scan_groups<'a, I>(groups: I, text: &str) -> Self
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        let units = split_units(text);
        let entities = groups
            .into_iter()
            .map(|aliases| {
                let matcher = TermMatcher::new(aliases);
                let mut contextual_units = 0;
                let mut mentioned_units = 0;
                for unit in &units {
                    if !matcher.is_match(unit) {
                        continue;
                    }
                    mentioned_units += 1;
                    if matcher.words_besides(unit) >= MIN_CONTEXT_WORDS {
                        contextual_units += 1;
                    }
                }
                EntityMentions {
                    canonical: aliases.first().cloned().unwrap_or_default(),
                    aliases: aliases.to_vec(),
                    contextual_units,
                    mentioned_units,
                }
            })
            .collect();

        Self {
            total_units: units.len(),
            entities,
        }
    }

    /// Whether any entity appears in a contextual unit.
    #[must_use]
    pub fn has_context(&self) -> bool {
        self.entities.iter().any(|e| e.contextual_units > 0)
    }

    /// Highest share of contextual units across entities; 0 for empty text.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn focus_ratio(&self) -> f64 {
        if self.total_units == 0 {
            return 0.0;
        }
        let best = self
            .entities
            .iter()
            .map(|e| e.contextual_units)
            .max()
            .unwrap_or(0);
        best as f64 / self.total_units as f64
    }

    /// Aliases of every entity mentioned in the text.
    #[must_use]
    pub fn removal_terms(&self) -> Vec<String> {
        self.entities
            .iter()
            .filter(|e| e.mentioned_units > 0)
            .flat_map(|e| e.aliases.iter().cloned())
            .collect()
    }

    /// Canonical names of the entities mentioned in the text.
    #[must_use]
    pub fn mentioned(&self) -> Vec<&str> {
        self.entities
            .iter()
            .filter(|e| e.mentioned_units > 0)
            .map(|e| e.canonical.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mentions(contextual_units: usize, mentioned_units: usize) -> EntityMentions {
        EntityMentions {
            canonical: "Peter Parker".to_string(),
            aliases: vec!["Peter Parker".to_string(), "Spidey".to_string()],
            contextual_units,
            mentioned_units,
        }
    }

    #[test]
    fn empty_scan_has_zero_ratio() {
        let scan = EntityScan::default();
        assert!(scan.focus_ratio().abs() < f64::EPSILON);
        assert!(!scan.has_context());
        assert!(scan.removal_terms().is_empty());
    }

    #[test]
    fn ratio_uses_most_focused_entity() {
        let scan = EntityScan {
            total_units: 4,
            entities: vec![mentions(1, 1), mentions(3, 3)],
        };
        assert!((scan.focus_ratio() - 0.75).abs() < f64::EPSILON);
        assert!(scan.has_context());
    }

    #[test]
    fn bare_mentions_still_yield_removal_terms() {
        let scan = EntityScan {
            total_units: 2,
            entities: vec![mentions(0, 1)],
        };
        assert!(!scan.has_context());
        assert_eq!(scan.removal_terms().len(), 2);
        assert_eq!(scan.mentioned(), vec!["Peter Parker"]);
    }

    #[test]
    fn alias_inside_longer_word_is_not_a_mention() {
        let group = vec!["Ben Reilly".to_string(), "Ben".to_string()];
        let scan = EntityScan::scan_groups(
            [group.as_slice()],
            "Benjamin works at the bank. Ben Reilly wears a blue hoodie.",
        );
        assert_eq!(scan.total_units, 2);
        assert_eq!(scan.entities[0].mentioned_units, 1);
        assert_eq!(scan.entities[0].contextual_units, 1);
    }

    #[test]
    fn unrelated_word_prefix_leaves_scan_clear() {
        let group = vec!["Ben".to_string()];
        let scan = EntityScan::scan_groups([group.as_slice()], "Benjamin works at the bank.");
        assert!(!scan.has_context());
        assert!(scan.mentioned().is_empty());
    }
}
