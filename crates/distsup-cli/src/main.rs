use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use colored::Colorize;
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use distsup_core::config::{resolve_rules_path, RulesFile};
use distsup_core::criterion::{describe_tree, EvidenceMode, Outcome};
use distsup_core::{clean_file, Result, RunOptions, Supervisor};

mod args;
use args::{Cli, Commands, RulesAction, Shell};

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let rules_path = resolve_rules_path(cli.rules);
    debug!(rules = %rules_path.display(), "resolved rules file");
    let quiet = cli.quiet;

    let result = match cli.command {
        Some(Commands::Run {
            inputs,
            evidence,
            no_evidence,
            no_progress,
            lang,
        }) => handle_run(
            &rules_path,
            &inputs,
            RunOverrides {
                evidence: evidence_override(evidence, no_evidence),
                no_progress: no_progress || quiet,
                lang,
            },
            quiet,
        ),
        Some(Commands::Check { text }) => handle_check(&rules_path, &text),
        Some(Commands::Clean { inputs }) => handle_clean(&inputs, quiet),
        Some(Commands::Rules { action }) => handle_rules(action, &rules_path),
        Some(Commands::Completions { shell }) => {
            handle_completions(shell);
            Ok(())
        }
        None => {
            Cli::command().print_help().ok();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red().bold(), e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Diagnostics go to stderr; stdout carries progress and results.
/// `RUST_LOG` wins over the verbosity flags.
fn init_logging(verbose: bool, quiet: bool) {
    let default_filter = if verbose {
        "distsup_core=debug,distsup_cli=debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(env_filter),
        )
        .init();
}

fn handle_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let shell = match shell {
        Shell::Bash => clap_complete::Shell::Bash,
        Shell::Zsh => clap_complete::Shell::Zsh,
        Shell::Fish => clap_complete::Shell::Fish,
        Shell::PowerShell => clap_complete::Shell::PowerShell,
        Shell::Elvish => clap_complete::Shell::Elvish,
    };
    generate(shell, &mut cmd, "distsup", &mut io::stdout());
}

/// CLI options that override the rules file's `[run]` section
struct RunOverrides {
    evidence: Option<bool>,
    no_progress: bool,
    lang: Option<String>,
}

fn evidence_override(evidence: bool, no_evidence: bool) -> Option<bool> {
    match (evidence, no_evidence) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn handle_run(
    rules_path: &Path,
    inputs: &[PathBuf],
    overrides: RunOverrides,
    quiet: bool,
) -> Result<()> {
    let rules = RulesFile::load(rules_path)?;

    let options = apply_overrides(rules.run.to_run_options(), overrides);
    debug!(
        evidence = options.append_evidence,
        progress = options.print_progress,
        lang = %options.lang,
        "run options"
    );

    for (idx, input) in inputs.iter().enumerate() {
        info!(input = %input.display(), "labeling {}/{}", idx + 1, inputs.len());
        // Each supervisor owns its criterion tree.
        let supervisor = Supervisor::new(input, rules.criterion.build()?);

        let summary = if quiet {
            supervisor.run_with_progress(&options, &mut io::sink())?
        } else {
            supervisor.run(&options)?
        };
        if summary.counts.total() == 0 {
            warn!(input = %input.display(), "no records were labeled");
        }

        if quiet {
            continue;
        }
        for (path, (category, count)) in summary.output_paths.iter().zip(summary.counts.iter()) {
            println!(
                "  {} {} {}",
                category.cyan(),
                path.display().to_string().dimmed(),
                format!("({count})").yellow()
            );
        }
    }

    Ok(())
}

/// Command-line flags win over the rules file's `[run]` section.
fn apply_overrides(mut options: RunOptions, overrides: RunOverrides) -> RunOptions {
    if let Some(evidence) = overrides.evidence {
        options.append_evidence = evidence;
    }
    if overrides.no_progress {
        options.print_progress = false;
    }
    if let Some(lang) = overrides.lang {
        options.lang = lang;
    }
    options
}

fn handle_check(rules_path: &Path, text: &str) -> Result<()> {
    let (_, criterion) = RulesFile::load_criterion(rules_path)?;

    match criterion.categorise(text, EvidenceMode::Collect) {
        Outcome::Matched { category, evidence } => {
            println!("{} {}", "Matched:".green(), category.cyan().bold());
            println!("  Evidence: {}", evidence.join(", "));
        }
        Outcome::NoMatch => {
            println!("{}", "No category".dimmed());
        }
        Outcome::Contradiction => {
            println!(
                "{} matches more than one category of '{}'",
                "Contradiction:".yellow(),
                criterion.name()
            );
        }
    }

    Ok(())
}

fn handle_clean(inputs: &[PathBuf], quiet: bool) -> Result<()> {
    for input in inputs {
        debug!(input = %input.display(), "stripping evidence");
        let summary = clean_file(input)?;
        if !quiet {
            println!(
                "{} {} ({} records)",
                "Cleaned:".green(),
                summary.output_path.display(),
                summary.records
            );
        }
    }
    Ok(())
}

fn handle_rules(action: RulesAction, rules_path: &Path) -> Result<()> {
    match action {
        RulesAction::Init => {
            let path = RulesFile::init(rules_path)?;
            info!(path = %path.display(), "wrote rules template");
            println!("{} {}", "Initialized:".green(), path.display());
        }
        RulesAction::Show { toml } => {
            let (rules, criterion) = RulesFile::load_criterion(rules_path)?;
            if toml {
                print!("{}", rules.to_toml()?);
                return Ok(());
            }

            println!();
            println!("Rules: {}", rules_path.display().to_string().cyan());
            println!(
                "Run: evidence={} progress={} lang={}",
                rules.run.append_evidence, rules.run.print_progress, rules.run.lang
            );
            println!();
            print!("{}", describe_tree(criterion.as_ref()));
            println!();
        }
        RulesAction::Path => {
            println!("{}", rules_path.display());
        }
    }

    Ok(())
}
