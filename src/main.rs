mod commands;
mod config;
mod corpus;
mod export;
mod logging;
mod tui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::config::{Config, Overrides, serialize_config};

#[derive(Parser)]
#[command(
    name = "jsonvu",
    about = "Browse, filter, mark and export a JSON Lines corpus of NER-annotated articles"
)]
struct Cli {
    /// JSON Lines file to open
    #[arg(required_unless_present = "print_config")]
    file: Option<PathBuf>,
    /// Print corpus statistics instead of opening the viewer
    #[arg(long)]
    summary: bool,
    /// Read settings from a `key: value` config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Directory export files are written to
    #[arg(long, value_name = "DIR")]
    export_dir: Option<PathBuf>,
    /// Comma-separated entity tags cycled by `f`
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    tags: Option<Vec<String>>,
    /// Write a trace log to this file (filtered by RUST_LOG)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
    /// Print the effective configuration as a config file and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            tags: self.tags.clone(),
            export_dir: self.export_dir.clone(),
            log_file: self.log_file.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref(), cli.overrides())?;
    if cli.print_config {
        print!("{}", serialize_config(&config));
        return Ok(());
    }
    let file = cli.file.context("no corpus file given")?;
    let _log_guard = logging::init(config.log_file.as_deref())?;

    if cli.summary {
        commands::summary::run(&file)
    } else {
        commands::view::run(&file, config)
    }
}
