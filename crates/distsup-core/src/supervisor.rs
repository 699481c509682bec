//! Streaming dispatcher.
//!
//! Reads newline-delimited JSON tweets, categorises each English original
//! tweet with one criterion, and appends matches to a file per category.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::criterion::{Criterion, EvidenceMode, Outcome};
use crate::error::{DistsupError, Result};

pub const DEFAULT_LANG: &str = "en";

/// Field appended to written records when evidence is requested.
pub const EVIDENCE_FIELD: &str = "evidence";

const TEXT_FIELD: &str = "text";
const LANG_FIELD: &str = "lang";
const RETWEET_FIELD: &str = "retweeted_status";

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub append_evidence: bool,
    pub print_progress: bool,
    pub lang: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            append_evidence: false,
            print_progress: true,
            lang: DEFAULT_LANG.to_string(),
        }
    }
}

/// Per-category record counts plus a running total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counts {
    total: u64,
    per_category: Vec<(String, u64)>,
}

impl Counts {
    pub fn new(categories: &[String]) -> Self {
        Self {
            total: 0,
            per_category: categories.iter().map(|c| (c.clone(), 0)).collect(),
        }
    }

    fn increment(&mut self, category: &str) {
        if let Some((_, n)) = self.per_category.iter_mut().find(|(c, _)| c == category) {
            *n += 1;
            self.total += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn get(&self, category: &str) -> Option<u64> {
        self.per_category
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, n)| *n)
    }

    /// Categories with their counts, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.per_category.iter().map(|(c, n)| (c.as_str(), *n))
    }

    /// `total: 3, happy: 2, sad: 1`
    pub fn summary_line(&self) -> String {
        std::iter::once(format!("total: {}", self.total))
            .chain(self.iter().map(|(c, n)| format!("{c}: {n}")))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Result of one supervisor run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub counts: Counts,
    pub output_paths: Vec<PathBuf>,
    /// Lines read from the input, including blank and malformed ones.
    pub lines_read: usize,
    /// English original tweets that were categorised.
    pub records_considered: usize,
}

/// Open output files, one per category. Closed when dropped.
struct CategorySinks {
    writers: Vec<(String, BufWriter<File>)>,
}

impl CategorySinks {
    fn open(categories: &[String], paths: &[PathBuf]) -> Result<Self> {
        let writers = categories
            .iter()
            .zip(paths)
            .map(|(category, path)| Ok((category.clone(), BufWriter::new(File::create(path)?))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { writers })
    }

    fn write_line(&mut self, category: &str, line: &str) -> io::Result<()> {
        if let Some((_, writer)) = self.writers.iter_mut().find(|(c, _)| c == category) {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }

    fn finish(mut self) -> io::Result<()> {
        for (_, writer) in &mut self.writers {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Mutable state of a single run: the open sinks and the counts so far.
struct RunState {
    sinks: CategorySinks,
    counts: Counts,
    lines_read: usize,
    records_considered: usize,
}

/// Output path for one category: the input path up to its first `.json`,
/// then `-<criterion>-<category>.json`.
pub fn output_path(input: &Path, criterion: &str, category: &str) -> PathBuf {
    let input = input.to_string_lossy();
    let prefix = match input.find(".json") {
        Some(idx) => &input[..idx],
        None => &input,
    };
    PathBuf::from(format!("{prefix}-{criterion}-{category}.json"))
}

/// Parse a line and keep it only if it is an English original tweet with text.
fn qualifying_record(line: &[u8], lang: &str) -> Option<Map<String, Value>> {
    let Ok(Value::Object(record)) = serde_json::from_slice::<Value>(line) else {
        return None;
    };

    let has_text = record.get(TEXT_FIELD).is_some_and(Value::is_string);
    let lang_matches = record.get(LANG_FIELD).and_then(Value::as_str) == Some(lang);
    let is_retweet = record.contains_key(RETWEET_FIELD);

    (has_text && lang_matches && !is_retweet).then_some(record)
}

/// Applies one criterion to a tweet file.
#[derive(Debug)]
pub struct Supervisor {
    input: PathBuf,
    criterion: Box<dyn Criterion>,
    output_paths: Vec<PathBuf>,
}

impl Supervisor {
    pub fn new(input: impl Into<PathBuf>, criterion: Box<dyn Criterion>) -> Self {
        let input = input.into();
        let output_paths = criterion
            .categories()
            .iter()
            .map(|category| output_path(&input, criterion.name(), category))
            .collect();

        Self {
            input,
            criterion,
            output_paths,
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn criterion(&self) -> &dyn Criterion {
        self.criterion.as_ref()
    }

    /// One path per category, in category order.
    pub fn output_paths(&self) -> &[PathBuf] {
        &self.output_paths
    }

    /// Run with progress written to stdout.
    pub fn run(&self, options: &RunOptions) -> Result<RunSummary> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.run_with_progress(options, &mut out)
    }

    pub fn run_with_progress<W: Write>(
        &self,
        options: &RunOptions,
        progress: &mut W,
    ) -> Result<RunSummary> {
        if !self.input.exists() {
            return Err(DistsupError::InputNotFound {
                path: self.input.clone(),
            });
        }
        let reader = BufReader::new(File::open(&self.input)?);

        let mut state = RunState {
            sinks: CategorySinks::open(self.criterion.categories(), &self.output_paths)?,
            counts: Counts::new(self.criterion.categories()),
            lines_read: 0,
            records_considered: 0,
        };
        info!(
            input = %self.input.display(),
            criterion = self.criterion.name(),
            sinks = self.output_paths.len(),
            "opened category outputs"
        );

        for line in reader.split(b'\n') {
            let line = line?;
            state.lines_read += 1;

            if !self.process_line(&mut state, &line, options)? {
                continue;
            }
            if options.print_progress {
                write!(progress, "{}\r", self.status_line(&state.counts))?;
                progress.flush()?;
            }
        }

        writeln!(progress, "{}", self.status_line(&state.counts))?;

        let RunState {
            sinks,
            counts,
            lines_read,
            records_considered,
        } = state;
        sinks.finish()?;

        debug!(
            lines_read,
            records_considered,
            skipped = lines_read - records_considered,
            "finished streaming pass"
        );
        info!(total = counts.total(), "labeling run complete");

        Ok(RunSummary {
            counts,
            output_paths: self.output_paths.clone(),
            lines_read,
            records_considered,
        })
    }

    /// Handle one input line. Returns whether the line was a qualifying tweet.
    fn process_line(
        &self,
        state: &mut RunState,
        line: &[u8],
        options: &RunOptions,
    ) -> Result<bool> {
        let Some(mut record) = qualifying_record(line, &options.lang) else {
            return Ok(false);
        };
        state.records_considered += 1;

        let mode = EvidenceMode::from_flag(options.append_evidence);
        let outcome = match record.get(TEXT_FIELD).and_then(Value::as_str) {
            Some(text) => self.criterion.categorise(text, mode),
            None => return Ok(false),
        };

        if let Outcome::Matched { category, evidence } = outcome {
            if options.append_evidence {
                record.insert(EVIDENCE_FIELD.to_string(), Value::from(evidence));
            }
            let line = serde_json::to_string(&Value::Object(record))?;
            state.sinks.write_line(&category, &line)?;
            state.counts.increment(&category);
        }

        Ok(true)
    }

    fn status_line(&self, counts: &Counts) -> String {
        format!(
            "{} {} {}",
            self.input.display(),
            self.criterion.name(),
            counts.summary_line()
        )
    }
}
