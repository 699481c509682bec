use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::criterion::{
    Criterion, GroupCriterion, GroupMode, Keyword, KeywordCriterion, KeywordMode,
};
use crate::error::{DistsupError, Result};
use crate::supervisor::{RunOptions, DEFAULT_LANG};

const RULES_DIR: &str = ".distsup";
const RULES_FILE: &str = "rules.toml";
const RULES_ENV: &str = "DISTSUP_RULES";

/// Default rules template with rich comments
const DEFAULT_RULES_TEMPLATE: &str = r##"# distsup rules file
# Location: ~/.distsup/rules.toml (override with --rules or DISTSUP_RULES)

[run]
# Append an "evidence" list of matched keywords to every written record
append_evidence = true
# Overwrite a status line on stdout after every English original tweet
print_progress = true
# Records must carry this "lang" value to be considered
lang = "en"

# One top-level criterion. Outputs are written to
# <input>-<criterion name>-<category>.json
[criterion]
type = "group"
name = "emotion"
# "any": children may abstain, but must not disagree
# "all": every child must pick the same category; a silent child voids it
mode = "any"

[[criterion.children]]
type = "keyword"
name = "hashtags"
# "in" (substring), "split" (whole token) or "regex" (whitespace-anchored)
keyword_mode = "split"

[[criterion.children.categories]]
name = "happy"
keywords = ["#happy", "#joy", "#excited"]

[[criterion.children.categories]]
name = "sad"
keywords = ["#sad", "#depressed", "#unhappy"]

[[criterion.children]]
type = "keyword"
name = "emoticons"
keyword_mode = "regex"
# Library patterns are also available in regex mode:
#   keywords = [{ library = "emoticon" }, { library = "url" }]

[[criterion.children.categories]]
name = "happy"
keywords = [":)", ":-)", ":D", "=)"]

[[criterion.children.categories]]
name = "sad"
keywords = [":(", ":-(", ":'("]
"##;

/// A rules file: run defaults plus one criterion tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesFile {
    #[serde(default)]
    pub run: RunDefaults,
    pub criterion: CriterionSpec,
}

/// `[run]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDefaults {
    #[serde(default)]
    pub append_evidence: bool,

    #[serde(default = "default_true")]
    pub print_progress: bool,

    #[serde(default = "default_lang")]
    pub lang: String,
}

fn default_true() -> bool {
    true
}

fn default_lang() -> String {
    DEFAULT_LANG.to_string()
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            append_evidence: false,
            print_progress: true,
            lang: default_lang(),
        }
    }
}

impl RunDefaults {
    pub fn to_run_options(&self) -> RunOptions {
        RunOptions {
            append_evidence: self.append_evidence,
            print_progress: self.print_progress,
            lang: self.lang.clone(),
        }
    }
}

/// Declarative form of a criterion node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CriterionSpec {
    Keyword {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        keyword_mode: Option<String>,
        /// Shorthand for `keyword_mode = "regex"`.
        #[serde(default)]
        consider_surrounding: bool,
        #[serde(default)]
        categories: Vec<CategorySpec>,
    },
    Group {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mode: Option<String>,
        #[serde(default)]
        children: Vec<CriterionSpec>,
    },
}

/// `[[...categories]]` entry of a keyword criterion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySpec {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<Keyword>,
}

impl CriterionSpec {
    /// Construct the criterion, running every construction-time check.
    pub fn build(&self) -> Result<Box<dyn Criterion>> {
        match self {
            Self::Keyword {
                name,
                keyword_mode,
                consider_surrounding,
                categories,
            } => {
                let mut mode: KeywordMode = match keyword_mode {
                    Some(m) => m.parse()?,
                    None => KeywordMode::default(),
                };
                if *consider_surrounding {
                    mode = KeywordMode::Regex;
                }
                let table = categories
                    .iter()
                    .map(|c| (c.name.clone(), c.keywords.clone()))
                    .collect();
                let name = name.as_deref().unwrap_or("Keyword");
                Ok(Box::new(KeywordCriterion::new(name, mode, table)?))
            }
            Self::Group {
                name,
                mode,
                children,
            } => {
                let mode: GroupMode = match mode {
                    Some(m) => m.parse()?,
                    None => GroupMode::default(),
                };
                let children = children
                    .iter()
                    .map(CriterionSpec::build)
                    .collect::<Result<Vec<_>>>()?;
                let name = name.as_deref().unwrap_or("Group");
                Ok(Box::new(GroupCriterion::new(name, mode, children)?))
            }
        }
    }
}

impl RulesFile {
    /// Load a rules file from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DistsupError::RulesNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// Parse rules from TOML text; `origin` is only used in error messages.
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| DistsupError::RulesParse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load and build in one step.
    pub fn load_criterion(path: &Path) -> Result<(Self, Box<dyn Criterion>)> {
        let rules = Self::load(path)?;
        let criterion = rules.criterion.build()?;
        Ok((rules, criterion))
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the commented template unless a file already exists there.
    pub fn init(path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        if !path.exists() {
            fs::write(path, DEFAULT_RULES_TEMPLATE)?;
        }

        Ok(path.to_path_buf())
    }
}

/// Rules path: CLI flag, then `DISTSUP_RULES`, then `~/.distsup/rules.toml`.
pub fn resolve_rules_path(cli_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_path {
        return path;
    }

    if let Ok(path) = std::env::var(RULES_ENV) {
        return PathBuf::from(path);
    }

    dirs::home_dir()
        .map(|h| h.join(RULES_DIR).join(RULES_FILE))
        .unwrap_or_else(|| PathBuf::from(RULES_DIR).join(RULES_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criterion::{EvidenceMode, Outcome};
    use crate::regexes::LibraryPattern;
    use tempfile::TempDir;

    fn parse(content: &str) -> Result<RulesFile> {
        RulesFile::parse(content, Path::new("test.toml"))
    }

    #[test]
    fn test_template_builds_and_classifies() {
        let rules = parse(DEFAULT_RULES_TEMPLATE).unwrap();
        assert!(rules.run.append_evidence);
        assert_eq!(rules.run.lang, "en");

        let criterion = rules.criterion.build().unwrap();
        assert_eq!(criterion.name(), "emotion");
        assert_eq!(criterion.categories(), &["happy", "sad"]);
        assert_eq!(
            criterion.categorise("best day ever #happy :)", EvidenceMode::Collect),
            Outcome::matched("happy", vec!["#happy".to_string(), ":)".to_string()])
        );
        assert!(criterion
            .categorise("#happy but :(", EvidenceMode::Collect)
            .is_contradiction());
    }

    #[test]
    fn test_defaults_when_sections_omitted() {
        let rules = parse(
            r#"
            [criterion]
            type = "keyword"

            [[criterion.categories]]
            name = "A"
            keywords = ["cat"]
            "#,
        )
        .unwrap();
        assert!(!rules.run.append_evidence);
        assert!(rules.run.print_progress);

        let criterion = rules.criterion.build().unwrap();
        assert_eq!(criterion.name(), "Keyword");
        assert_eq!(
            criterion.categorise("concatenate", EvidenceMode::Skip).category(),
            Some("A")
        );
    }

    #[test]
    fn test_consider_surrounding_forces_regex() {
        let rules = parse(
            r#"
            [criterion]
            type = "keyword"
            keyword_mode = "in"
            consider_surrounding = true

            [[criterion.categories]]
            name = "A"
            keywords = ["cat"]
            "#,
        )
        .unwrap();
        let criterion = rules.criterion.build().unwrap();
        assert_eq!(
            criterion.categorise("concatenate", EvidenceMode::Skip),
            Outcome::NoMatch
        );
        assert_eq!(
            criterion.categorise("a cat ran", EvidenceMode::Skip).category(),
            Some("A")
        );
    }

    #[test]
    fn test_library_keywords_parse() {
        let rules = parse(
            r#"
            [criterion]
            type = "keyword"
            name = "links"
            keyword_mode = "regex"

            [[criterion.categories]]
            name = "link"
            keywords = [{ library = "url" }, "link"]
            "#,
        )
        .unwrap();

        match &rules.criterion {
            CriterionSpec::Keyword { categories, .. } => {
                assert_eq!(
                    categories[0].keywords,
                    vec![
                        Keyword::Library {
                            library: LibraryPattern::Url
                        },
                        Keyword::literal("link"),
                    ]
                );
            }
            other => panic!("unexpected spec: {other:?}"),
        }

        let criterion = rules.criterion.build().unwrap();
        assert_eq!(
            criterion.categorise("read https://example.com/a now", EvidenceMode::Collect),
            Outcome::matched("link", vec!["https://example.com/a".to_string()])
        );
    }

    #[test]
    fn test_mismatched_group_fails_at_build() {
        let rules = parse(
            r#"
            [criterion]
            type = "group"
            name = "g"

            [[criterion.children]]
            type = "keyword"
            [[criterion.children.categories]]
            name = "A"
            keywords = ["a"]

            [[criterion.children]]
            type = "keyword"
            [[criterion.children.categories]]
            name = "B"
            keywords = ["b"]
            "#,
        )
        .unwrap();
        let err = rules.criterion.build().unwrap_err();
        assert!(matches!(err, DistsupError::CategoryMismatch { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_unsupported_modes_fail_at_build() {
        let rules = parse(
            r#"
            [criterion]
            type = "keyword"
            keyword_mode = "fuzzy"
            "#,
        )
        .unwrap();
        assert!(matches!(
            rules.criterion.build(),
            Err(DistsupError::UnsupportedKeywordMode { .. })
        ));

        let rules = parse(
            r#"
            [criterion]
            type = "group"
            mode = "most"
            "#,
        )
        .unwrap();
        assert!(matches!(
            rules.criterion.build(),
            Err(DistsupError::UnsupportedGroupMode { .. })
        ));
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let err = parse("[criterion\n").unwrap_err();
        match err {
            DistsupError::RulesParse { path, .. } => assert_eq!(path, PathBuf::from("test.toml")),
            e => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_init_writes_template_once() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("rules.toml");

        RulesFile::init(&path).unwrap();
        let (rules, criterion) = RulesFile::load_criterion(&path).unwrap();
        assert_eq!(criterion.name(), "emotion");
        assert!(rules.to_toml().unwrap().contains("emotion"));

        fs::write(&path, "# edited").unwrap();
        RulesFile::init(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "# edited");
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = RulesFile::load(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, DistsupError::RulesNotFound { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_resolve_rules_path_prefers_cli() {
        let path = resolve_rules_path(Some(PathBuf::from("/tmp/custom.toml")));
        assert_eq!(path, PathBuf::from("/tmp/custom.toml"));
    }
}
