//! # Criterion Module
//!
//! Rule objects that assign a text to at most one category.
//!
//! ## Variants
//!
//! - **KeywordCriterion**: keyword tables per category, matched by substring,
//!   whitespace token or anchored regex.
//! - **GroupCriterion**: combines child criteria that share a category list,
//!   under `any` or `all` semantics.
//!
//! A text that matches two different categories inside one `categorise` call is
//! a contradiction and yields no category at all.
//!
//! ## Example
//!
//! ```rust
//! use distsup_core::criterion::{Criterion, EvidenceMode, KeywordCriterion, KeywordMode, Outcome};
//!
//! let criterion = KeywordCriterion::from_literals(
//!     "pets",
//!     KeywordMode::In,
//!     vec![("A", vec!["cat"]), ("B", vec!["dog"])],
//! )
//! .unwrap();
//!
//! assert_eq!(
//!     criterion.categorise("I saw a cat", EvidenceMode::Collect),
//!     Outcome::matched("A", vec!["cat".to_string()])
//! );
//! assert_eq!(
//!     criterion.categorise("cat and dog", EvidenceMode::Collect),
//!     Outcome::Contradiction
//! );
//! assert_eq!(criterion.categorise("bird", EvidenceMode::Collect), Outcome::NoMatch);
//! ```

mod group;
mod keyword;

pub use group::{GroupCriterion, GroupMode};
pub use keyword::{Keyword, KeywordCriterion, KeywordMode};

/// Whether `categorise` should collect the strings that caused a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvidenceMode {
    Collect,
    /// Only the category decision is needed; evidence stays empty.
    #[default]
    Skip,
}

impl EvidenceMode {
    pub fn from_flag(collect: bool) -> Self {
        if collect {
            Self::Collect
        } else {
            Self::Skip
        }
    }

    pub fn collects(self) -> bool {
        matches!(self, Self::Collect)
    }
}

/// Result of categorising one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Matched {
        category: String,
        /// Original keyword strings in match order. Empty under [`EvidenceMode::Skip`].
        evidence: Vec<String>,
    },
    NoMatch,
    /// Two or more distinct categories matched.
    Contradiction,
}

impl Outcome {
    pub fn matched(category: impl Into<String>, evidence: Vec<String>) -> Self {
        Self::Matched {
            category: category.into(),
            evidence,
        }
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            Self::Matched { category, .. } => Some(category),
            _ => None,
        }
    }

    pub fn evidence(&self) -> Option<&[String]> {
        match self {
            Self::Matched { evidence, .. } => Some(evidence),
            Self::NoMatch => Some(&[]),
            Self::Contradiction => None,
        }
    }

    pub fn is_contradiction(&self) -> bool {
        matches!(self, Self::Contradiction)
    }

    /// Split into the `(category, evidence)` pair used by line-oriented tooling:
    /// a contradiction has no evidence list at all, a plain miss has an empty one.
    pub fn into_parts(self) -> (Option<String>, Option<Vec<String>>) {
        match self {
            Self::Matched { category, evidence } => (Some(category), Some(evidence)),
            Self::NoMatch => (None, Some(Vec::new())),
            Self::Contradiction => (None, None),
        }
    }
}

/// A rule that classifies a text into at most one of its categories.
pub trait Criterion: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// Declared categories, in order.
    fn categories(&self) -> &[String];

    fn num_of_categories(&self) -> usize {
        self.categories().len()
    }

    fn categorise(&self, text: &str, mode: EvidenceMode) -> Outcome;

    /// Child criteria, for display. Leaves have none.
    fn children(&self) -> &[Box<dyn Criterion>] {
        &[]
    }

    /// One-line description of this node's own settings.
    fn describe(&self) -> String;
}

/// Render a criterion tree as indented lines.
pub fn describe_tree(criterion: &dyn Criterion) -> String {
    let mut out = String::new();
    write_tree(criterion, 0, &mut out);
    out
}

fn write_tree(criterion: &dyn Criterion, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(&criterion.describe());
    out.push('\n');
    for child in criterion.children() {
        write_tree(child.as_ref(), depth + 1, out);
    }
}
