//! Text matching helpers: interrogative detection, alias lookup, sentence
//! units and whole-word alias matching.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A named regex that marks a query as asking about something.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterrogativePattern {
    pub name: String,
    pub pattern: String,
}

impl InterrogativePattern {
    #[must_use]
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

/// Default English interrogative patterns.
#[must_use]
pub fn default_interrogatives() -> Vec<InterrogativePattern> {
    vec![
        InterrogativePattern::new(
            "wh_question",
            r"\b(who|what|where|when|why|how)\s+(is|was|are|were|did|does|do|has|had)\b",
        ),
        InterrogativePattern::new("wh_contraction", r"\b(who|what|where)'s\b"),
        InterrogativePattern::new("tell_me", r"\btell\s+me\s+(about|more)\b"),
        InterrogativePattern::new("describe", r"\b(describe|explain|summari[sz]e|elaborate)\b"),
        InterrogativePattern::new("know_about", r"\bwhat\s+do\s+you\s+know\s+about\b"),
        InterrogativePattern::new(
            "info_about",
            r"\b(information|info|details|facts|background)\s+(about|on|of)\b",
        ),
        InterrogativePattern::new("history_of", r"\b(history|biography|story|origin)\s+of\b"),
        InterrogativePattern::new("question_mark", r"\?\s*$"),
    ]
}

/// Decides whether a query asks about something.
pub struct InterrogativeDetector {
    patterns: Vec<(String, Regex)>,
}

impl InterrogativeDetector {
    /// Compile `patterns` case-insensitively. Invalid regexes are skipped.
    #[must_use]
    pub fn new(patterns: &[InterrogativePattern]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| {
                match RegexBuilder::new(&p.pattern).case_insensitive(true).build() {
                    Ok(re) => Some((p.name.clone(), re)),
                    Err(e) => {
                        warn!("Skipping interrogative pattern {}: {e}", p.name);
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(&default_interrogatives())
    }

    /// Name of the first pattern matching `query`.
    #[must_use]
    pub fn matched(&self, query: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(query.trim()))
            .map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn is_interrogative(&self, query: &str) -> bool {
        self.matched(query).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for InterrogativeDetector {
    fn default() -> Self {
        Self::with_defaults()
    }
}

pub static DEFAULT_DETECTOR: Lazy<InterrogativeDetector> =
    Lazy::new(InterrogativeDetector::with_defaults);

/// First of `terms` occurring in `text`, compared case-insensitively.
#[must_use]
pub fn find_term<'a, I>(text: &str, terms: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let lower = text.to_lowercase();
    terms
        .into_iter()
        .filter(|t| !t.trim().is_empty())
        .find(|t| lower.contains(&t.to_lowercase()))
}

/// Split text into sentence-level units: lines first, then sentence ends.
#[must_use]
pub fn split_units(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    for line in text.lines() {
        let mut start = 0;
        let mut chars = line.char_indices().peekable();
        while let Some((idx, ch)) = chars.next() {
            if !matches!(ch, '.' | '!' | '?') {
                continue;
            }
            let boundary = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
            if boundary {
                let end = idx + ch.len_utf8();
                push_unit(&mut units, &line[start..end]);
                start = end;
            }
        }
        push_unit(&mut units, &line[start..]);
    }
    units
}

fn push_unit<'a>(units: &mut Vec<&'a str>, candidate: &'a str) {
    let trimmed = candidate.trim();
    if trimmed.chars().any(char::is_alphanumeric) {
        units.push(trimmed);
    }
}

/// Case-insensitive regex matching `term` as a whole word or phrase.
fn term_regex(term: &str) -> Option<Regex> {
    let trimmed = term.trim();
    if trimmed.is_empty() {
        return None;
    }
    let escaped = regex::escape(trimmed);
    let lead = if trimmed.starts_with(char::is_alphanumeric) { r"\b" } else { "" };
    let tail = if trimmed.ends_with(char::is_alphanumeric) { r"\b" } else { "" };
    RegexBuilder::new(&format!("{lead}{escaped}{tail}"))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Remove every occurrence of `terms`, longest first. Returns the text and
/// the number of removals. Runs of spaces left behind are collapsed; nothing
/// else is repaired.
#[must_use]
pub fn strip_terms(text: &str, terms: &[String]) -> (String, usize) {
    TermMatcher::new(terms).strip(text)
}

/// Whole-word matcher over a group of terms, compiled once.
pub struct TermMatcher {
    /// Longest term first.
    regexes: Vec<Regex>,
}

impl TermMatcher {
    #[must_use]
    pub fn new(terms: &[String]) -> Self {
        let mut ordered: Vec<&String> = terms.iter().collect();
        ordered.sort_by_key(|t| std::cmp::Reverse(t.len()));
        let regexes = ordered.into_iter().filter_map(|t| term_regex(t.as_str())).collect();
        Self { regexes }
    }

    /// Whether any term occurs in `text` as a whole word or phrase.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regexes.iter().any(|re| re.is_match(text))
    }

    #[must_use]
    pub fn strip(&self, text: &str) -> (String, usize) {
        let mut out = text.to_string();
        let mut removed = 0;
        for re in &self.regexes {
            let hits = re.find_iter(&out).count();
            if hits > 0 {
                removed += hits;
                out = re.replace_all(&out, "").into_owned();
            }
        }

        let collapsed = out
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join("\n");
        (collapsed, removed)
    }

    /// Number of words in `unit` once every term is removed.
    #[must_use]
    pub fn words_besides(&self, unit: &str) -> usize {
        let (rest, _) = self.strip(unit);
        rest.split_whitespace()
            .filter(|w| w.chars().any(char::is_alphanumeric))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_detects_common_question_forms() {
        let detector = InterrogativeDetector::with_defaults();
        assert!(detector.is_interrogative("Who is Peter Parker"));
        assert!(detector.is_interrogative("Tell me about Peter Parker"));
        assert!(detector.is_interrogative("please DESCRIBE spider-man"));
        assert!(detector.is_interrogative("what's the deal with Spidey"));
        assert!(detector.is_interrogative("Peter Parker?"));
        assert_eq!(detector.matched("Explain quantum physics"), Some("describe"));
    }

    #[test]
    fn test_statements_are_not_interrogative() {
        let detector = InterrogativeDetector::with_defaults();
        assert!(!detector.is_interrogative("Write a poem about Peter Parker"));
        assert!(!detector.is_interrogative("hello"));
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let detector = InterrogativeDetector::new(&[
            InterrogativePattern::new("broken", "(unclosed"),
            InterrogativePattern::new("ok", "who"),
        ]);
        assert_eq!(detector.len(), 1);
    }

    #[test]
    fn test_find_term_case_insensitive() {
        let aliases = terms(&["Spider-Man", "Peter Parker"]);
        let hit = find_term("is peter parker real", aliases.iter().map(String::as_str));
        assert_eq!(hit, Some("Peter Parker"));
        assert!(find_term("nothing here", aliases.iter().map(String::as_str)).is_none());
    }

    #[test]
    fn test_split_units_by_line_and_sentence() {
        let text = "First one. Second one!\nThird line without stop\n\n3.14 is pi. Done?";
        let units = split_units(text);
        assert_eq!(
            units,
            vec![
                "First one.",
                "Second one!",
                "Third line without stop",
                "3.14 is pi.",
                "Done?"
            ]
        );
    }

    #[test]
    fn test_strip_terms_longest_first() {
        let (out, removed) = strip_terms(
            "Peter Benjamin Parker met Peter Parker.",
            &terms(&["Peter Parker", "Peter Benjamin Parker"]),
        );
        assert_eq!(removed, 2);
        assert_eq!(out, "met .");
    }

    #[test]
    fn test_strip_terms_respects_word_boundaries() {
        let (out, removed) = strip_terms("Harrys and Harry", &terms(&["Harry"]));
        assert_eq!(removed, 1);
        assert_eq!(out, "Harrys and");
    }

    #[test]
    fn test_words_besides_alias() {
        let matcher = TermMatcher::new(&terms(&["Peter Parker"]));
        assert_eq!(matcher.words_besides("Peter Parker."), 0);
        assert_eq!(
            matcher.words_besides("Peter Parker works at the Daily Bugle."),
            5
        );
    }

    #[test]
    fn test_matcher_ignores_alias_inside_longer_word() {
        let matcher = TermMatcher::new(&terms(&["Ben", "Spider-Man"]));
        assert!(!matcher.is_match("Benjamin works at the bank."));
        assert!(matcher.is_match("Later, ben left the bank."));
        assert!(matcher.is_match("SPIDER-MAN swung by."));
        assert_eq!(matcher.words_besides("Benjamin works at the bank."), 5);
    }
}
