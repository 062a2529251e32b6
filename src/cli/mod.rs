//! Command-line interface.

pub mod commands;
pub mod display;

use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

/// Top-level CLI definition.
#[derive(Debug, Parser)]
#[command(
    name = "quorum",
    version,
    about = "Multi-model council with a quality-gate convergence loop"
)]
pub struct Cli {
    /// Path to a config file (default: quorum.yaml merged with QUORUM_* env)
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Put one question to the council of models
    Ask(commands::ask::AskArgs),
    /// Iterate lint/scan/fix until the quality gate passes
    Converge(commands::converge::ConvergeArgs),
    /// Run or fetch a quality scan without fixing anything
    Scan(commands::scan::ScanArgs),
}

/// Load configuration, from an explicit file when given.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Print an error and terminate with a non-zero exit code.
pub fn handle_error(err: &anyhow::Error) -> ! {
    eprintln!("{} {err:#}", console::style("error:").red().bold());
    std::process::exit(1);
}
