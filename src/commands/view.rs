//! `jsonvu <FILE>`: load the corpus and open the interactive viewer.

use std::path::Path;

use anyhow::Result;

use crate::config::Config;
use crate::corpus::loader;
use crate::tui::app;

pub fn run(path: &Path, config: Config) -> Result<()> {
    let (corpus, report) = loader::load(path)?;
    report.emit();
    if corpus.is_empty() {
        tracing::warn!(path = %path.display(), "corpus has no records");
    }
    app::run(corpus, config)
}
