//! Active-set computation.
//!
//! Recomputed from scratch on every change. A linear rescan is fine for tens
//! of thousands of records; an inverted index per predicate would be the next
//! step for larger corpora.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

use crate::corpus::Corpus;
use crate::corpus::model::Record;
use crate::tui::state::{BaseSet, ViewState};

/// Records passing every enabled predicate, in base-set order.
pub fn active<'a>(corpus: &'a Corpus, view: &ViewState) -> Vec<&'a Record> {
    let base: Box<dyn Iterator<Item = &'a Record>> = match &view.base {
        BaseSet::Corpus => Box::new(corpus.records().iter()),
        BaseSet::Search { hits, .. } => {
            Box::new(hits.iter().filter_map(|&pos| corpus.get(pos)))
        }
        BaseSet::Source(name) => Box::new(
            corpus
                .sources()
                .group(name)
                .iter()
                .filter_map(|&pos| corpus.get(pos)),
        ),
    };

    base.filter(|r| {
        view.tag_filter.as_deref().is_none_or(|tag| r.has_tag(tag))
            && view
                .entity_filter
                .as_deref()
                .is_none_or(|text| r.has_entity(text))
            && (!view.marked_only || view.marked.contains(r.id()))
    })
    .collect()
}

/// Compile a search query: a case-insensitive pattern, or the query as a
/// literal when it is not a valid pattern.
pub fn compile_query(query: &str) -> Result<Regex> {
    match RegexBuilder::new(query).case_insensitive(true).build() {
        Ok(re) => Ok(re),
        Err(_) => RegexBuilder::new(&regex::escape(query))
            .case_insensitive(true)
            .build()
            .with_context(|| format!("cannot search for {query:?}")),
    }
}

/// Corpus positions of every record matching `query`, in corpus order.
pub fn search(corpus: &Corpus, query: &str) -> Result<Vec<usize>> {
    let re = compile_query(query)?;
    let hits: Vec<usize> = corpus
        .records()
        .iter()
        .enumerate()
        .filter(|(_, r)| record_matches(r, &re))
        .map(|(pos, _)| pos)
        .collect();
    tracing::debug!(query, hits = hits.len(), "search committed");
    Ok(hits)
}

/// Id, source, title, summary, text and every span text are searched. The id
/// is matched as written in the record; a missing id matches as empty.
pub fn record_matches(record: &Record, re: &Regex) -> bool {
    ["id", "source", "title", "summary", "text"]
        .iter()
        .any(|field| re.is_match(&record.text_of(field)))
        || record.spans().any(|s| re.is_match(&s.text))
}
