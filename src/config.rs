//! Viewer configuration: built-in defaults, an optional `key: value` file,
//! and command-line overrides on top.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Entity tags cycled by the tag filter when nothing else is configured.
pub const DEFAULT_TAGS: [&str; 5] = ["PERSON", "GPE", "ORG", "DATE", "PERCENT"];
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Order of the entity-tag filter cycle (none → tags[0] → … → none).
    pub tags: Vec<String>,
    /// Directory export files are written into.
    pub export_dir: PathBuf,
    pub poll_interval_ms: u64,
    /// Tracing output file; logging is off when unset.
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tags: DEFAULT_TAGS.iter().map(|t| t.to_string()).collect(),
            export_dir: PathBuf::from("."),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            log_file: None,
        }
    }
}

/// Values given on the command line; each one that is set wins over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub tags: Option<Vec<String>>,
    pub export_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Resolve defaults, then `path` (if any), then `overrides`.
    pub fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => load(p)?,
            None => Self::default(),
        };
        if let Some(tags) = overrides.tags {
            cfg.tags = normalize_tags(tags.iter().map(String::as_str))?;
        }
        if let Some(dir) = overrides.export_dir {
            cfg.export_dir = dir;
        }
        if let Some(log) = overrides.log_file {
            cfg.log_file = Some(log);
        }
        Ok(cfg)
    }
}

pub fn load(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    parse(&content).with_context(|| format!("invalid config {}", path.display()))
}

/// Parse a config file. Blank lines and `#` comments are ignored; an empty
/// value keeps the default for that key.
pub fn parse(input: &str) -> Result<Config> {
    let mut cfg = Config::default();
    for (idx, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            bail!("line {}: expected `key: value`, found {:?}", idx + 1, line);
        };
        let key = key.trim();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key {
            "tags" => {
                cfg.tags = normalize_tags(value.split(','))
                    .with_context(|| format!("line {}", idx + 1))?;
            }
            "export_dir" => cfg.export_dir = PathBuf::from(value),
            "poll_interval_ms" => {
                let ms: u64 = value.parse().with_context(|| {
                    format!("line {}: poll_interval_ms must be a whole number", idx + 1)
                })?;
                if ms == 0 {
                    bail!("line {}: poll_interval_ms must be greater than zero", idx + 1);
                }
                cfg.poll_interval_ms = ms;
            }
            "log_file" => cfg.log_file = Some(PathBuf::from(value)),
            other => bail!("line {}: unknown key {:?}", idx + 1, other),
        }
    }
    Ok(cfg)
}

fn normalize_tags<'a>(raw: impl Iterator<Item = &'a str>) -> Result<Vec<String>> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    if tags.is_empty() {
        bail!("tags must list at least one entity tag");
    }
    Ok(tags)
}

pub fn serialize_config(config: &Config) -> String {
    let log_file = config
        .log_file
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    format!(
        "\
# jsonvu configuration
# Pass with: jsonvu --config <this file> <corpus.jsonl>

# Entity tags cycled by [f], in order
tags: {}

# Directory that [x]/[r] exports are written into
export_dir: {}

# How long the viewer waits for a key before an idle redraw
poll_interval_ms: {}

# Write tracing output here (RUST_LOG sets the level); empty disables logging
log_file: {}
",
        config.tags.join(", "),
        config.export_dir.display(),
        config.poll_interval_ms,
        log_file
    )
}
