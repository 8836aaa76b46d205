//! The loaded corpus and the indices built over it at startup.

pub mod loader;
pub mod model;

use std::collections::{BTreeMap, BTreeSet};

use self::model::Record;

/// Distinct `source` values in sorted order, each with the corpus positions
/// that carry it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SourceIndex {
    names: Vec<String>,
    groups: BTreeMap<String, Vec<usize>>,
}

impl SourceIndex {
    fn build(records: &[Record]) -> Self {
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (pos, record) in records.iter().enumerate() {
            groups
                .entry(record.source().into_owned())
                .or_default()
                .push(pos);
        }
        let names = groups.keys().cloned().collect();
        Self { names, groups }
    }

    /// The source cycle.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.binary_search_by(|n| n.as_str().cmp(name)).ok()
    }

    pub fn group(&self, name: &str) -> &[usize] {
        self.groups.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Records sorted by id plus the read-only indices derived from them.
///
/// Built once; nothing here changes for the lifetime of a session.
#[derive(Debug, Default, Clone)]
pub struct Corpus {
    records: Vec<Record>,
    sources: SourceIndex,
    entities: Vec<String>,
}

impl Corpus {
    /// Stable-sort `records` by id and build the source and entity indices.
    pub fn from_records(mut records: Vec<Record>) -> Self {
        records.sort_by(|a, b| a.id().cmp(b.id()));
        let sources = SourceIndex::build(&records);
        let entities = records
            .iter()
            .flat_map(|r| r.spans())
            .filter(|s| !s.text.is_empty())
            .map(|s| s.text.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self {
            records,
            sources,
            entities,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, pos: usize) -> Option<&Record> {
        self.records.get(pos)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn sources(&self) -> &SourceIndex {
        &self.sources
    }

    /// Sorted distinct span texts across the whole corpus.
    pub fn entities(&self) -> &[String] {
        &self.entities
    }
}
