use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "distsup")]
#[command(about = "Distant supervision labeling of tweet corpora with keyword rules")]
#[command(version)]
pub struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Rules file (default: $DISTSUP_RULES or ~/.distsup/rules.toml)
    #[arg(long, global = true)]
    pub rules: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Label one or more line-delimited JSON tweet files
    Run {
        /// Input files (one JSON object per line)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Append matched keywords as an "evidence" field
        #[arg(long, conflicts_with = "no_evidence")]
        evidence: bool,

        /// Do not append evidence, even if the rules file asks for it
        #[arg(long)]
        no_evidence: bool,

        /// Do not print the running status line
        #[arg(long)]
        no_progress: bool,

        /// Language code records must carry (default: from rules file, "en")
        #[arg(long)]
        lang: Option<String>,
    },

    /// Categorise a single text and show the evidence
    Check {
        /// Text to categorise
        text: String,
    },

    /// Strip evidence from labeled files into lowercase plain text
    Clean {
        /// Labeled files written by `distsup run --evidence`
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Manage the rules file
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum RulesAction {
    /// Write a commented template rules file
    Init,

    /// Show the criterion tree
    Show {
        /// Print the parsed rules as TOML instead of a tree
        #[arg(long)]
        toml: bool,
    },

    /// Print the resolved rules file path
    Path,
}
