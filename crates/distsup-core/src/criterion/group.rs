//! Group Criterion
//!
//! Combines child criteria that share one category list.

use std::str::FromStr;

use crate::error::{DistsupError, Result};

use super::{Criterion, EvidenceMode, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupMode {
    /// Any child may decide; dissenting children void the result.
    #[default]
    Any,
    /// Every child must decide the same category; any other result is a contradiction.
    All,
}

impl GroupMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::All => "all",
        }
    }
}

impl FromStr for GroupMode {
    type Err = DistsupError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "any" => Ok(Self::Any),
            "all" => Ok(Self::All),
            other => Err(DistsupError::UnsupportedGroupMode {
                mode: other.to_string(),
            }),
        }
    }
}

#[derive(Debug)]
pub struct GroupCriterion {
    name: String,
    mode: GroupMode,
    categories: Vec<String>,
    criteria: Vec<Box<dyn Criterion>>,
}

impl GroupCriterion {
    /// Children must declare the same categories in the same order.
    pub fn new(
        name: impl Into<String>,
        mode: GroupMode,
        criteria: Vec<Box<dyn Criterion>>,
    ) -> Result<Self> {
        let name = name.into();
        let Some(first) = criteria.first() else {
            return Err(DistsupError::EmptyGroup { name });
        };
        let categories = first.categories().to_vec();

        if let Some(odd) = criteria[1..]
            .iter()
            .find(|c| c.categories() != categories.as_slice())
        {
            return Err(DistsupError::CategoryMismatch {
                group: name,
                child: odd.name().to_string(),
                expected: categories,
                found: odd.categories().to_vec(),
            });
        }

        Ok(Self {
            name,
            mode,
            categories,
            criteria,
        })
    }

    pub fn mode(&self) -> GroupMode {
        self.mode
    }

    fn categorise_any(&self, text: &str, mode: EvidenceMode) -> Outcome {
        if !mode.collects() {
            // Only the first child is consulted on this path. Kept as-is so
            // evidence-free runs label the same records as earlier releases.
            return match self.criteria[0].categorise(text, mode) {
                Outcome::Matched { category, .. } => Outcome::matched(category, Vec::new()),
                other => other,
            };
        }

        let mut decided: Option<String> = None;
        let mut all_evidence = Vec::new();

        // No short-circuit on a match: a later child may still contradict.
        for criterion in &self.criteria {
            match criterion.categorise(text, mode) {
                Outcome::Contradiction => return Outcome::Contradiction,
                Outcome::NoMatch => {}
                Outcome::Matched { category, evidence } => {
                    if decided.as_ref().is_some_and(|d| *d != category) {
                        return Outcome::Contradiction;
                    }
                    decided = Some(category);
                    all_evidence.extend(evidence);
                }
            }
        }

        match decided {
            Some(category) => Outcome::matched(category, all_evidence),
            None => Outcome::NoMatch,
        }
    }

    fn categorise_all(&self, text: &str, mode: EvidenceMode) -> Outcome {
        let mut decided: Option<String> = None;
        let mut all_evidence = Vec::new();

        for criterion in &self.criteria {
            match criterion.categorise(text, mode) {
                // A child that abstains voids the group just like one that disagrees.
                Outcome::Contradiction | Outcome::NoMatch => return Outcome::Contradiction,
                Outcome::Matched { category, evidence } => {
                    if decided.as_ref().is_some_and(|d| *d != category) {
                        return Outcome::Contradiction;
                    }
                    decided = Some(category);
                    all_evidence.extend(evidence);
                }
            }
        }

        match decided {
            Some(category) => Outcome::matched(category, all_evidence),
            None => Outcome::NoMatch,
        }
    }
}

impl Criterion for GroupCriterion {
    fn name(&self) -> &str {
        &self.name
    }

    fn categories(&self) -> &[String] {
        &self.categories
    }

    fn categorise(&self, text: &str, mode: EvidenceMode) -> Outcome {
        match self.mode {
            GroupMode::Any => self.categorise_any(text, mode),
            GroupMode::All => self.categorise_all(text, mode),
        }
    }

    fn children(&self) -> &[Box<dyn Criterion>] {
        &self.criteria
    }

    fn describe(&self) -> String {
        format!(
            "group '{}' (mode={}) categories=[{}]",
            self.name,
            self.mode.as_str(),
            self.categories.join(", ")
        )
    }
}
