//! Writes record subsets back out in the corpus's JSONL format.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::corpus::model::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// The current active set.
    Shown,
    /// Every marked record, regardless of filters.
    Marked,
}

impl ExportKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Shown => "shown",
            Self::Marked => "marked",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub count: usize,
}

impl ExportSummary {
    pub fn message(&self) -> String {
        format!("Exported {} records to {}", self.count, self.path.display())
    }
}

pub fn export_file_name(kind: ExportKind, count: usize) -> String {
    format!("exported_{}_{}_records.jsonl", kind.label(), count)
}

/// Write `records` to a fresh file in `dir`, one original record per line.
///
/// An existing file of the same name is replaced.
pub fn export_records(dir: &Path, kind: ExportKind, records: &[&Record]) -> Result<ExportSummary> {
    let path = dir.join(export_file_name(kind, records.len()));
    let file =
        File::create(&path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for record in records {
        let line = record
            .to_json_line()
            .with_context(|| format!("cannot serialize record {}", record.id()))?;
        out.write_all(line.as_bytes())
            .and_then(|_| out.write_all(b"\n"))
            .with_context(|| format!("cannot write {}", path.display()))?;
    }
    out.flush()
        .with_context(|| format!("cannot write {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        count = records.len(),
        kind = kind.label(),
        "export written"
    );
    Ok(ExportSummary {
        path,
        count: records.len(),
    })
}
