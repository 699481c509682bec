//! Keyword Criterion
//!
//! Leaf criterion backed by a keyword table per category.

use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DistsupError, Result};
use crate::regexes::LibraryPattern;

use super::{Criterion, EvidenceMode, Outcome};

/// How a keyword is compared against the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeywordMode {
    /// Literal substring.
    #[default]
    In,
    /// Equality with one whitespace-delimited token.
    Split,
    /// Escaped literal bounded by whitespace or the ends of the text.
    Regex,
}

impl KeywordMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Split => "split",
            Self::Regex => "regex",
        }
    }
}

impl FromStr for KeywordMode {
    type Err = DistsupError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "in" => Ok(Self::In),
            "split" => Ok(Self::Split),
            "regex" => Ok(Self::Regex),
            other => Err(DistsupError::UnsupportedKeywordMode {
                mode: other.to_string(),
            }),
        }
    }
}

/// One entry of a keyword table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Keyword {
    Literal(String),
    /// Raw pattern from the regex library (regex mode only).
    Library { library: LibraryPattern },
}

impl Keyword {
    pub fn literal(s: impl Into<String>) -> Self {
        Self::Literal(s.into())
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "{s:?}"),
            Self::Library { library } => write!(f, "<{library}>"),
        }
    }
}

/// Wrap an escaped literal in whitespace-or-boundary anchors.
///
/// This is not `\b`: `"cat!"` only matches where the `!` is followed by
/// whitespace or the end of the text.
pub fn anchored_pattern(keyword: &str) -> String {
    format!(r"(\s|\A){}(\s|\z)", regex::escape(keyword))
}

#[derive(Debug)]
struct CompiledKeyword {
    keyword: Keyword,
    regex: Option<Regex>,
}

impl CompiledKeyword {
    fn compile(criterion: &str, keyword: Keyword, mode: KeywordMode) -> Result<Self> {
        let regex = match (&keyword, mode) {
            (Keyword::Literal(s), KeywordMode::Regex) => Some(
                Regex::new(&anchored_pattern(s)).map_err(|source| DistsupError::InvalidRegex {
                    keyword: s.clone(),
                    source,
                })?,
            ),
            (Keyword::Literal(_), _) => None,
            (Keyword::Library { library }, KeywordMode::Regex) => Some(library.regex().clone()),
            (Keyword::Library { library }, _) => {
                return Err(DistsupError::LibraryPatternOutsideRegex {
                    criterion: criterion.to_string(),
                    pattern: library.to_string(),
                })
            }
        };

        Ok(Self { keyword, regex })
    }

    /// The evidence string if this keyword occurs in `text`.
    fn find<'a>(&'a self, text: &'a str, mode: KeywordMode) -> Option<&'a str> {
        match (&self.keyword, &self.regex) {
            (Keyword::Literal(s), Some(re)) => re.is_match(text).then_some(s.as_str()),
            (Keyword::Library { .. }, Some(re)) => re.find(text).map(|m| m.as_str().trim()),
            (Keyword::Literal(s), None) => match mode {
                KeywordMode::Split => text.split_whitespace().any(|t| t == s).then_some(s.as_str()),
                _ => text.contains(s.as_str()).then_some(s.as_str()),
            },
            (Keyword::Library { .. }, None) => None,
        }
    }
}

/// Leaf criterion: categories mapped to keyword lists.
#[derive(Debug)]
pub struct KeywordCriterion {
    name: String,
    mode: KeywordMode,
    categories: Vec<String>,
    keywords: Vec<Vec<CompiledKeyword>>,
}

impl KeywordCriterion {
    pub fn new(
        name: impl Into<String>,
        mode: KeywordMode,
        table: Vec<(String, Vec<Keyword>)>,
    ) -> Result<Self> {
        let name = name.into();
        let mut categories = Vec::with_capacity(table.len());
        let mut keywords = Vec::with_capacity(table.len());

        for (category, entries) in table {
            if categories.contains(&category) {
                return Err(DistsupError::DuplicateCategory {
                    criterion: name,
                    category,
                });
            }
            let compiled = entries
                .into_iter()
                .map(|k| CompiledKeyword::compile(&name, k, mode))
                .collect::<Result<Vec<_>>>()?;
            categories.push(category);
            keywords.push(compiled);
        }

        Ok(Self {
            name,
            mode,
            categories,
            keywords,
        })
    }

    /// Build from plain string literals.
    pub fn from_literals(
        name: impl Into<String>,
        mode: KeywordMode,
        table: Vec<(&str, Vec<&str>)>,
    ) -> Result<Self> {
        let table = table
            .into_iter()
            .map(|(cat, kws)| {
                (
                    cat.to_string(),
                    kws.into_iter().map(Keyword::literal).collect(),
                )
            })
            .collect();
        Self::new(name, mode, table)
    }

    pub fn mode(&self) -> KeywordMode {
        self.mode
    }

    /// Keywords declared for `category`, in order.
    pub fn keywords(&self, category: &str) -> Option<Vec<&Keyword>> {
        let idx = self.categories.iter().position(|c| c == category)?;
        Some(self.keywords[idx].iter().map(|k| &k.keyword).collect())
    }
}

impl Criterion for KeywordCriterion {
    fn name(&self) -> &str {
        &self.name
    }

    fn categories(&self) -> &[String] {
        &self.categories
    }

    fn categorise(&self, text: &str, mode: EvidenceMode) -> Outcome {
        let mut decided: Option<&str> = None;
        let mut evidence = Vec::new();

        for (category, keywords) in self.categories.iter().zip(&self.keywords) {
            for keyword in keywords {
                let Some(hit) = keyword.find(text, self.mode) else {
                    continue;
                };
                if decided.is_some_and(|d| d != category) {
                    return Outcome::Contradiction;
                }
                decided = Some(category.as_str());
                if !mode.collects() {
                    break;
                }
                evidence.push(hit.to_string());
            }
        }

        match decided {
            Some(category) => Outcome::matched(category, evidence),
            None => Outcome::NoMatch,
        }
    }

    fn describe(&self) -> String {
        let tables: Vec<String> = self
            .categories
            .iter()
            .zip(&self.keywords)
            .map(|(cat, kws)| {
                let list: Vec<String> = kws.iter().map(|k| k.keyword.to_string()).collect();
                format!("{cat}: [{}]", list.join(", "))
            })
            .collect();
        format!(
            "keyword '{}' (mode={}) {}",
            self.name,
            self.mode.as_str(),
            tables.join("; ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pets(mode: KeywordMode) -> KeywordCriterion {
        KeywordCriterion::from_literals(
            "pets",
            mode,
            vec![("A", vec!["cat", "kitten"]), ("B", vec!["dog"])],
        )
        .unwrap()
    }

    fn ev(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_in_mode_single_match() {
        let c = pets(KeywordMode::In);
        assert_eq!(
            c.categorise("I saw a cat", EvidenceMode::Collect),
            Outcome::matched("A", ev(&["cat"]))
        );
    }

    #[test]
    fn test_in_mode_contradiction() {
        let c = pets(KeywordMode::In);
        assert_eq!(
            c.categorise("cat and dog", EvidenceMode::Collect),
            Outcome::Contradiction
        );
        assert_eq!(
            c.categorise("dog and cat", EvidenceMode::Skip),
            Outcome::Contradiction
        );
    }

    #[test]
    fn test_no_match_has_empty_evidence() {
        let c = pets(KeywordMode::In);
        let outcome = c.categorise("bird", EvidenceMode::Collect);
        assert_eq!(outcome, Outcome::NoMatch);
        assert_eq!(outcome.into_parts(), (None, Some(Vec::new())));
    }

    #[test]
    fn test_in_mode_matches_inside_words() {
        let c = pets(KeywordMode::In);
        assert_eq!(
            c.categorise("concatenate", EvidenceMode::Collect).category(),
            Some("A")
        );
    }

    #[test]
    fn test_evidence_collects_every_keyword_in_order() {
        let c = pets(KeywordMode::In);
        assert_eq!(
            c.categorise("a kitten is a small cat", EvidenceMode::Collect),
            Outcome::matched("A", ev(&["cat", "kitten"]))
        );
    }

    #[test]
    fn test_skip_mode_has_no_evidence() {
        let c = pets(KeywordMode::In);
        assert_eq!(
            c.categorise("a kitten is a small cat", EvidenceMode::Skip),
            Outcome::matched("A", Vec::new())
        );
    }

    #[test]
    fn test_split_mode_requires_whole_token() {
        let c = pets(KeywordMode::Split);
        assert_eq!(
            c.categorise("my cat\tsleeps", EvidenceMode::Collect),
            Outcome::matched("A", ev(&["cat"]))
        );
        assert_eq!(
            c.categorise("my cat! sleeps", EvidenceMode::Collect),
            Outcome::NoMatch
        );
        assert_eq!(c.categorise("catdog", EvidenceMode::Collect), Outcome::NoMatch);
    }

    #[test]
    fn test_regex_mode_whitespace_anchoring() {
        let c = pets(KeywordMode::Regex);
        assert_eq!(
            c.categorise("a cat ran", EvidenceMode::Collect),
            Outcome::matched("A", ev(&["cat"]))
        );
        assert_eq!(c.categorise("cat", EvidenceMode::Collect).category(), Some("A"));
        assert_eq!(
            c.categorise("concatenate", EvidenceMode::Collect),
            Outcome::NoMatch
        );
        // Punctuation adjacent to the keyword blocks the match.
        assert_eq!(c.categorise("my cat.", EvidenceMode::Collect), Outcome::NoMatch);
    }

    #[test]
    fn test_regex_mode_escapes_metacharacters() {
        let c = KeywordCriterion::from_literals(
            "smileys",
            KeywordMode::Regex,
            vec![("happy", vec![":)", ":-)"]), ("sad", vec![":("])],
        )
        .unwrap();

        assert_eq!(
            c.categorise("good day :)", EvidenceMode::Collect),
            Outcome::matched("happy", ev(&[":)"]))
        );
        assert_eq!(
            c.categorise("good day :-) :)", EvidenceMode::Collect),
            Outcome::matched("happy", ev(&[":)", ":-)"]))
        );
        assert_eq!(c.categorise("x:)", EvidenceMode::Collect), Outcome::NoMatch);
        assert_eq!(
            c.categorise(":) but :(", EvidenceMode::Collect),
            Outcome::Contradiction
        );
    }

    #[test]
    fn test_library_keyword_reports_matched_text() {
        let c = KeywordCriterion::new(
            "emoticons",
            KeywordMode::Regex,
            vec![
                (
                    "emoticon".to_string(),
                    vec![Keyword::Library {
                        library: LibraryPattern::Emoticon,
                    }],
                ),
                ("plain".to_string(), vec![Keyword::literal("nothing")]),
            ],
        )
        .unwrap();

        assert_eq!(
            c.categorise("what a day ;-) really", EvidenceMode::Collect),
            Outcome::matched("emoticon", ev(&[";-)"]))
        );
    }

    #[test]
    fn test_library_keyword_rejected_outside_regex_mode() {
        let err = KeywordCriterion::new(
            "bad",
            KeywordMode::In,
            vec![(
                "x".to_string(),
                vec![Keyword::Library {
                    library: LibraryPattern::Url,
                }],
            )],
        )
        .unwrap_err();
        assert!(matches!(err, DistsupError::LibraryPatternOutsideRegex { .. }));
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let err = KeywordCriterion::from_literals(
            "dup",
            KeywordMode::In,
            vec![("A", vec!["a"]), ("A", vec!["b"])],
        )
        .unwrap_err();
        assert!(matches!(err, DistsupError::DuplicateCategory { .. }));
    }

    #[test]
    fn test_keyword_mode_parse() {
        assert_eq!("split".parse::<KeywordMode>().unwrap(), KeywordMode::Split);
        assert!(matches!(
            "fuzzy".parse::<KeywordMode>(),
            Err(DistsupError::UnsupportedKeywordMode { .. })
        ));
    }

    #[test]
    fn test_categories_follow_declaration_order() {
        let c = KeywordCriterion::from_literals(
            "order",
            KeywordMode::In,
            vec![("z", vec!["z"]), ("a", vec!["a"]), ("m", vec!["m"])],
        )
        .unwrap();
        assert_eq!(c.categories(), &["z", "a", "m"]);
        assert_eq!(c.num_of_categories(), 3);
        assert_eq!(c.keywords("a").unwrap(), vec![&Keyword::literal("a")]);
        assert!(c.keywords("q").is_none());
    }

    #[test]
    fn test_anchored_pattern_shape() {
        assert_eq!(anchored_pattern("a.b"), r"(\s|\A)a\.b(\s|\z)");
    }
}
