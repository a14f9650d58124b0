//! JSON Lines dataset layer.
//!
//! Crawl output is written incrementally, one complete JSON object per line,
//! so an interrupted crawl still leaves a readable prefix. The same records
//! feed the fine-tuning converter and the local retriever.

mod convert;

pub use convert::{ConvertSummary, convert_csv};

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ragpipe_shared::{PageRecord, RagpipeError, Result};

// ---------------------------------------------------------------------------
// RecordSink
// ---------------------------------------------------------------------------

/// Destination for crawl records, written one at a time in visit order.
pub trait RecordSink {
    /// Append a single record. A failed append is fatal to the crawl.
    fn append(&mut self, record: &PageRecord) -> Result<()>;
}

// ---------------------------------------------------------------------------
// JsonlWriter
// ---------------------------------------------------------------------------

/// JSONL file writer, flushing after every record so a partial run leaves
/// a valid prefix of complete lines.
pub struct JsonlWriter {
    path: PathBuf,
    out: BufWriter<File>,
}

impl JsonlWriter {
    /// Create (or truncate) the dataset file at `path`, creating parent
    /// directories as needed.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| RagpipeError::io(parent, e))?;
            }
        }

        let file = File::create(path).map_err(|e| RagpipeError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
        })
    }

    /// Path this writer appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for JsonlWriter {
    fn append(&mut self, record: &PageRecord) -> Result<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| RagpipeError::validation(format!("record serialization failed: {e}")))?;
        writeln!(self.out, "{line}").map_err(|e| RagpipeError::io(&self.path, e))?;
        self.out.flush().map_err(|e| RagpipeError::io(&self.path, e))
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Load a JSONL dataset back into memory.
///
/// Blank lines are skipped; a malformed line fails the load.
pub fn read_records(path: &Path) -> Result<Vec<PageRecord>> {
    let file = File::open(path).map_err(|e| RagpipeError::io(path, e))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| RagpipeError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: PageRecord = serde_json::from_str(&line).map_err(|e| {
            RagpipeError::validation(format!(
                "malformed record at {}:{}: {e}",
                path.display(),
                i + 1
            ))
        })?;
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: usize) -> PageRecord {
        PageRecord {
            url: format!("https://example.com/page{n}"),
            title: format!("Page {n}"),
            content: format!("Content of page {n}"),
        }
    }

    #[test]
    fn writes_one_complete_line_per_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("crawl.jsonl");

        let mut writer = JsonlWriter::create(&path).expect("create writer");
        writer.append(&record(1)).expect("append");
        writer.append(&record(2)).expect("append");

        let content = std::fs::read_to_string(&path).expect("read back");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in &lines {
            let value: serde_json::Value = serde_json::from_str(line).expect("complete JSON line");
            assert!(value.get("URL").is_some());
        }
    }

    #[test]
    fn partial_output_is_a_valid_prefix() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("crawl.jsonl");

        // Drop the writer after one record, as an interrupted crawl would.
        {
            let mut writer = JsonlWriter::create(&path).expect("create writer");
            writer.append(&record(1)).expect("append");
        }

        let records = read_records(&path).expect("read prefix");
        assert_eq!(records, vec![record(1)]);
    }

    #[test]
    fn roundtrip_preserves_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("crawl.jsonl");

        let mut writer = JsonlWriter::create(&path).expect("create writer");
        for n in 0..5 {
            writer.append(&record(n)).expect("append");
        }
        drop(writer);

        let records = read_records(&path).expect("read");
        assert_eq!(records.len(), 5);
        assert_eq!(records[3], record(3));
    }

    #[test]
    fn read_skips_blank_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("crawl.jsonl");
        std::fs::write(
            &path,
            "{\"URL\":\"https://a/\",\"Title\":\"A\",\"Content\":\"x\"}\n\n",
        )
        .expect("write");

        let records = read_records(&path).expect("read");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn read_rejects_malformed_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("crawl.jsonl");
        std::fs::write(&path, "not json\n").expect("write");

        let err = read_records(&path).unwrap_err();
        assert!(err.to_string().contains("malformed record"));
    }
}
