//! View state and navigation over the active set.
//!
//! Everything here is owned by the controller. Positions are plain indices;
//! the cursor is reduced modulo the active set's size whenever it is read, so
//! a shrinking active set can never leave it out of range.

use std::collections::HashSet;

use anyhow::Result;

use crate::corpus::model::RecordId;
use crate::corpus::{Corpus, SourceIndex};
use crate::tui::filter;

/// The set the entity, tag and marked filters are layered on top of.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BaseSet {
    #[default]
    Corpus,
    /// Committed free-text search; holds corpus positions in corpus order.
    Search { query: String, hits: Vec<usize> },
    /// Source-cycle selection.
    Source(String),
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// Live query buffer; also the highlight term while non-empty.
    pub query: String,
    /// Printable keys go to `query` instead of being commands.
    pub editing_query: bool,
    pub base: BaseSet,
    pub tag_filter: Option<String>,
    pub entity_filter: Option<String>,
    pub marked_only: bool,
    pub marked: HashSet<RecordId>,
    cursor: usize,
    scroll: usize,
    /// Position in the source cycle; `None` until the first Up/Down after a reset.
    source_pos: Option<usize>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the current record within an active set of `len`, if any.
    pub fn current_index(&self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.cursor % len)
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    /// True when any predicate narrows the corpus.
    pub fn filters_active(&self) -> bool {
        self.base != BaseSet::Corpus
            || self.tag_filter.is_some()
            || self.entity_filter.is_some()
            || self.marked_only
    }

    pub fn reset_position(&mut self) {
        self.cursor = 0;
        self.scroll = 0;
    }

    /// Step `delta` records through an active set of `len`, wrapping at both
    /// ends. A no-op on an empty set.
    pub fn move_cursor(&mut self, delta: isize, len: usize) {
        if len == 0 {
            return;
        }
        let current = (self.cursor % len) as isize;
        self.cursor = (current + delta).rem_euclid(len as isize) as usize;
        self.scroll = 0;
    }

    /// Step through the source cycle and make that source's group the base
    /// set. This is a navigation and a filter change at once: it replaces any
    /// committed search and resets the cursor.
    ///
    /// The first step after a reset starts from `anchor`, the source of the
    /// record on screen, so Down always means "the next source after this one".
    pub fn cycle_source(
        &mut self,
        delta: isize,
        sources: &SourceIndex,
        anchor: Option<&str>,
    ) -> Option<String> {
        if sources.is_empty() {
            return None;
        }
        let n = sources.len();
        let from = self
            .source_pos
            .or_else(|| anchor.and_then(|a| sources.position(a)))
            .unwrap_or(0);
        let next = (from as isize + delta).rem_euclid(n as isize) as usize;
        let name = sources.names()[next].clone();
        self.source_pos = Some(next);
        self.base = BaseSet::Source(name.clone());
        self.reset_position();
        Some(name)
    }

    /// Commit the query buffer. An empty buffer clears whatever base set is
    /// active. Returns the number of hits, or `None` when the search was
    /// cleared.
    pub fn commit_search(&mut self, corpus: &Corpus) -> Result<Option<usize>> {
        let query = self.query.trim().to_string();
        self.editing_query = false;
        self.source_pos = None;
        self.reset_position();
        if query.is_empty() {
            self.base = BaseSet::Corpus;
            return Ok(None);
        }
        let hits = filter::search(corpus, &query)?;
        let count = hits.len();
        self.base = BaseSet::Search { query, hits };
        Ok(Some(count))
    }

    /// Advance the tag filter: none → tags[0] → … → last → none.
    pub fn cycle_tag(&mut self, tags: &[String]) {
        self.tag_filter = match &self.tag_filter {
            None => tags.first().cloned(),
            Some(current) => match tags.iter().position(|t| t == current) {
                Some(i) => tags.get(i + 1).cloned(),
                None => tags.first().cloned(),
            },
        };
        self.reset_position();
    }

    pub fn set_entity_filter(&mut self, entity: Option<String>) {
        self.entity_filter = entity;
        self.reset_position();
    }

    pub fn toggle_marked_only(&mut self) {
        self.marked_only = !self.marked_only;
        self.reset_position();
    }

    /// Drop the query and every filter. Marks survive.
    pub fn clear_filters(&mut self) {
        self.query.clear();
        self.editing_query = false;
        self.base = BaseSet::Corpus;
        self.tag_filter = None;
        self.entity_filter = None;
        self.marked_only = false;
        self.source_pos = None;
        self.reset_position();
    }

    /// Flip the mark on `id`; returns whether it is now marked.
    pub fn toggle_mark(&mut self, id: &RecordId) -> bool {
        if self.marked.remove(id) {
            false
        } else {
            self.marked.insert(id.clone());
            true
        }
    }

    pub fn is_marked(&self, id: &RecordId) -> bool {
        self.marked.contains(id)
    }

    pub fn mark_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a RecordId>) {
        self.marked.extend(ids.into_iter().cloned());
    }

    /// Scroll by `pages` viewport heights, clamped to the record's lines.
    pub fn scroll_pages(&mut self, pages: isize, line_count: usize, viewport_height: usize) {
        let step = viewport_height.max(1) as isize * pages;
        let target = (self.scroll as isize + step).max(0) as usize;
        self.scroll = target;
        self.clamp_scroll(line_count, viewport_height);
    }

    /// Pull the scroll offset back into `[0, lines - height]`.
    pub fn clamp_scroll(&mut self, line_count: usize, viewport_height: usize) {
        self.scroll = self.scroll.min(line_count.saturating_sub(viewport_height));
    }
}
