//! `jsonvu --summary <FILE>`: print corpus statistics without opening the viewer.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Result;
use crossterm::style::Stylize;

use crate::corpus::Corpus;
use crate::corpus::loader::{self, LoadReport};

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

pub fn run(path: &Path) -> Result<()> {
    let (corpus, report) = loader::load(path)?;
    report.emit();
    print_report(path, &compute(&corpus, &report));
    Ok(())
}

// ---------------------------------------------------------------------------
// Computation (testable, no I/O)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CorpusSummary {
    pub records: usize,
    pub lines_read: usize,
    pub skipped: usize,
    /// Record count per source, in source-cycle order. The empty name is the
    /// group of records without a source.
    pub sources: Vec<(String, usize)>,
    /// Span count per tag, most frequent first, ties by tag.
    pub tags: Vec<(String, usize)>,
    pub distinct_entities: usize,
    /// Every top-level field name seen in any record.
    pub fields: Vec<String>,
}

pub fn compute(corpus: &Corpus, report: &LoadReport) -> CorpusSummary {
    let sources = corpus
        .sources()
        .names()
        .iter()
        .map(|name| (name.clone(), corpus.sources().group(name).len()))
        .collect();

    let mut tag_counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut fields: BTreeSet<&str> = BTreeSet::new();
    for record in corpus.records() {
        for span in record.spans() {
            if !span.value.is_empty() {
                *tag_counts.entry(span.value.as_str()).or_default() += 1;
            }
        }
        fields.extend(record.fields().keys().map(String::as_str));
    }
    let mut tags: Vec<(String, usize)> = tag_counts
        .into_iter()
        .map(|(tag, count)| (tag.to_string(), count))
        .collect();
    tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    CorpusSummary {
        records: corpus.len(),
        lines_read: report.lines_read,
        skipped: report.skipped.len(),
        sources,
        tags,
        distinct_entities: corpus.entities().len(),
        fields: fields.into_iter().map(str::to_string).collect(),
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_report(path: &Path, s: &CorpusSummary) {
    println!("\n  {}", path.display().to_string().bold());
    println!(
        "    {} records from {} lines, {} skipped line{}",
        s.records,
        s.lines_read,
        s.skipped,
        if s.skipped == 1 { "" } else { "s" }
    );

    if !s.sources.is_empty() {
        println!("\n  {}", "Sources:".cyan().bold());
        for (name, count) in &s.sources {
            let name = if name.is_empty() { "(none)" } else { name };
            println!("    {name:<30} {count}");
        }
    }

    if !s.tags.is_empty() {
        println!("\n  {}", "Entity tags:".cyan().bold());
        for (tag, count) in &s.tags {
            println!("    {tag:<30} {count}");
        }
    }
    println!("\n  {} {}", "Distinct entities:".cyan().bold(), s.distinct_entities);

    if !s.fields.is_empty() {
        println!("\n  {}", "Fields:".cyan().bold());
        println!("    {}", s.fields.join(", "));
    }
    println!();
}
