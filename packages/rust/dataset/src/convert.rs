//! CSV to fine-tuning JSONL conversion.
//!
//! Reads a crawl export with `Title`/`Content` columns and writes
//! `prompt`/`completion` JSON Lines, dropping rows at or over the
//! character limit.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use ragpipe_shared::{RagpipeError, Result};

/// Columns the input CSV must carry.
const REQUIRED_COLUMNS: [&str; 2] = ["Title", "Content"];

/// Input row shape for the crawl CSV export.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Content")]
    content: String,
}

/// One fine-tuning example line.
#[derive(Debug, Serialize)]
struct TrainingExample<'a> {
    prompt: &'a str,
    completion: &'a str,
}

/// Summary of a conversion run.
#[derive(Debug, Clone)]
pub struct ConvertSummary {
    /// Rows written to the output.
    pub written: usize,
    /// Rows dropped for exceeding the character limit.
    pub dropped: usize,
}

/// Convert `input` CSV into `output` JSONL.
///
/// A row is kept only when its prompt, its completion, and their sum are all
/// strictly under `char_limit` characters. Missing required columns abort the
/// run with a validation error; output already flushed stays on disk.
pub fn convert_csv(input: &Path, output: &Path, char_limit: usize) -> Result<ConvertSummary> {
    let mut reader = csv::Reader::from_path(input)
        .map_err(|e| RagpipeError::validation(format!("cannot read {}: {e}", input.display())))?;

    let headers = reader
        .headers()
        .map_err(|e| RagpipeError::validation(format!("cannot read CSV headers: {e}")))?
        .clone();
    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(RagpipeError::validation(format!(
                "CSV file must contain '{required}' column"
            )));
        }
    }

    let file = File::create(output).map_err(|e| RagpipeError::io(output, e))?;
    let mut out = BufWriter::new(file);

    let mut written = 0usize;
    let mut dropped = 0usize;

    for row in reader.deserialize::<CsvRow>() {
        let row = row.map_err(|e| RagpipeError::validation(format!("malformed CSV row: {e}")))?;

        if !within_limit(&row.title, &row.content, char_limit) {
            dropped += 1;
            continue;
        }

        let example = TrainingExample {
            prompt: &row.title,
            completion: &row.content,
        };
        let line = serde_json::to_string(&example)
            .map_err(|e| RagpipeError::validation(format!("example serialization failed: {e}")))?;
        writeln!(out, "{}", to_ascii(&line)).map_err(|e| RagpipeError::io(output, e))?;
        written += 1;
    }

    out.flush().map_err(|e| RagpipeError::io(output, e))?;

    info!(written, dropped, output = %output.display(), "conversion complete");

    Ok(ConvertSummary { written, dropped })
}

/// Strict limits: each side and the sum must stay under the cap.
fn within_limit(prompt: &str, completion: &str, limit: usize) -> bool {
    let p = prompt.chars().count();
    let c = completion.chars().count();
    p < limit && c < limit && p + c < limit
}

/// The training format is plain ASCII; anything outside is replaced.
fn to_ascii(line: &str) -> String {
    line.chars().map(|c| if c.is_ascii() { c } else { '?' }).collect()
}
