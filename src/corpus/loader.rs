//! Line-delimited JSON reader for the corpus file.
//!
//! Malformed lines never abort a load: they are collected into a
//! [`LoadReport`] and skipped. Only failing to open or read the file is fatal.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use super::Corpus;
use super::model::Record;

/// A line that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number in the input file.
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub lines_read: usize,
    pub skipped: Vec<SkippedLine>,
}

impl LoadReport {
    /// Write one diagnostic per skipped line to stderr and the log.
    pub fn emit(&self) {
        for skipped in &self.skipped {
            eprintln!("Skipping line {}: {}", skipped.line, skipped.message);
            tracing::warn!(line = skipped.line, error = %skipped.message, "skipped corpus line");
        }
    }
}

/// Read and index the corpus at `path`.
pub fn load(path: &Path) -> Result<(Corpus, LoadReport)> {
    let file =
        File::open(path).with_context(|| format!("cannot open corpus {}", path.display()))?;
    let (records, report) = read_records(BufReader::new(file))
        .with_context(|| format!("failed reading corpus {}", path.display()))?;
    let corpus = Corpus::from_records(records);
    tracing::info!(
        path = %path.display(),
        records = corpus.len(),
        skipped = report.skipped.len(),
        sources = corpus.sources().len(),
        entities = corpus.entities().len(),
        "corpus loaded"
    );
    Ok((corpus, report))
}

/// Parse every non-blank line of `reader` as a JSON object.
///
/// Records come back in input order; sorting is [`Corpus::from_records`]'s job.
pub fn read_records<R: BufRead>(mut reader: R) -> Result<(Vec<Record>, LoadReport)> {
    let mut records = Vec::new();
    let mut report = LoadReport::default();
    let mut buf = Vec::new();
    let mut line_num = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_num += 1;
        report.lines_read = line_num;

        let raw = match std::str::from_utf8(&buf) {
            Ok(s) => s,
            Err(e) => {
                report.skipped.push(SkippedLine {
                    line: line_num,
                    message: format!("invalid UTF-8: {e}"),
                });
                continue;
            }
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => records.push(Record::from_map(map)),
            Ok(other) => report.skipped.push(SkippedLine {
                line: line_num,
                message: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
            Err(e) => report.skipped.push(SkippedLine {
                line: line_num,
                message: format!("invalid JSON: {e}"),
            }),
        }
    }

    Ok((records, report))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
