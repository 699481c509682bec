//! Evidence stripping for labeled output.
//!
//! Turns a category file written with evidence into plain training text: the
//! matched keywords are removed so a model cannot learn the labeling rule back.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use crate::error::{DistsupError, Result};
use crate::supervisor::EVIDENCE_FIELD;

/// Result of cleaning one file
#[derive(Debug, Clone)]
pub struct CleanSummary {
    pub output_path: PathBuf,
    pub records: usize,
}

/// Remove every occurrence of each evidence string, collapse whitespace and lowercase.
pub fn clean_text(text: &str, evidence: &[String]) -> String {
    let mut text = text.to_string();
    for item in evidence.iter().filter(|e| !e.is_empty()) {
        text = text.replace(item.as_str(), "");
    }
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// `<dir>/<file name up to its first dot>-cleaned.txt`
pub fn cleaned_path(input: &Path) -> PathBuf {
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = file_name.split('.').next().unwrap_or_default();
    input.with_file_name(format!("{stem}-cleaned.txt"))
}

/// Clean every record of a labeled file into one text line each.
pub fn clean_file(input: &Path) -> Result<CleanSummary> {
    if !input.exists() {
        return Err(DistsupError::InputNotFound {
            path: input.to_path_buf(),
        });
    }

    let reader = BufReader::new(File::open(input)?);
    let output_path = cleaned_path(input);
    let mut writer = BufWriter::new(File::create(&output_path)?);
    let mut records = 0;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let (text, evidence) = parse_labeled(&line).map_err(|message| {
            DistsupError::MalformedRecord {
                path: input.to_path_buf(),
                line: idx + 1,
                message,
            }
        })?;

        writeln!(writer, "{}", clean_text(&text, &evidence))?;
        records += 1;
    }

    writer.flush()?;
    info!(output = %output_path.display(), records, "wrote cleaned text");

    Ok(CleanSummary {
        output_path,
        records,
    })
}

fn parse_labeled(line: &str) -> std::result::Result<(String, Vec<String>), String> {
    let value: Value = serde_json::from_str(line).map_err(|e| e.to_string())?;
    let text = value
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing string field \"text\"".to_string())?
        .to_string();

    let evidence = match value.get(EVIDENCE_FIELD) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| "evidence entries must be strings".to_string())
            })
            .collect::<std::result::Result<Vec<_>, _>>()?,
        Some(_) => return Err("\"evidence\" must be a list".to_string()),
    };

    Ok((text, evidence))
}
