pub mod cleanup;
pub mod config;
pub mod criterion;
pub mod error;
pub mod regexes;
pub mod supervisor;

pub use cleanup::{clean_file, clean_text, cleaned_path, CleanSummary};
pub use config::{resolve_rules_path, CategorySpec, CriterionSpec, RulesFile, RunDefaults};
pub use error::{DistsupError, Result};
pub use regexes::{tokenize, LibraryPattern};
pub use supervisor::{output_path, Counts, RunOptions, RunSummary, Supervisor};

// Criterion engine
pub use criterion::{
    describe_tree, Criterion, EvidenceMode, GroupCriterion, GroupMode, Keyword, KeywordCriterion,
    KeywordMode, Outcome,
};
