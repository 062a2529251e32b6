//! `quorum converge` -- run the convergence loop against a project.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::domain::models::{Config, LanguageProfile};
use crate::infrastructure::endpoints::{build_fixer, Endpoint};
use crate::infrastructure::quality::{QualityGateClient, QualityGateConfig};
use crate::services::{ConvergenceLoop, ConvergenceParams};

#[derive(Debug, Args)]
pub struct ConvergeArgs {
    /// Project directory to converge
    pub project_dir: PathBuf,

    /// Quality server project key
    #[arg(long)]
    pub project_key: String,

    /// Language profile (python, ansible, terraform)
    #[arg(long)]
    pub language: Option<String>,

    /// Maximum fix iterations
    #[arg(long)]
    pub max_iterations: Option<u32>,
}

pub async fn execute(args: ConvergeArgs, config: Config) -> Result<()> {
    let quality = QualityGateClient::new(QualityGateConfig {
        base_url: config.quality.base_url.clone(),
        token: config.quality.token.clone(),
        scanner_command: config.quality.scanner_command.clone(),
        poll_interval: Duration::from_secs(config.quality.poll_interval_secs),
        task_timeout: Duration::from_secs(config.quality.timeout_secs),
        ..Default::default()
    })?;

    let fixer = build_fixer(&config.endpoints)?;

    let language = args
        .language
        .unwrap_or_else(|| config.convergence.language.clone());
    let max_iterations = args
        .max_iterations
        .unwrap_or(config.convergence.max_iterations)
        .max(1);

    let convergence = ConvergenceLoop::new(
        quality,
        fixer.clone(),
        LanguageProfile::for_language(&language),
        ConvergenceParams {
            project_dir: args.project_dir,
            project_key: args.project_key,
            max_iterations,
        },
    );

    let result = convergence.run().await;
    fixer.close().await;

    println!("{}", result.format_summary());

    if !result.final_passed {
        std::process::exit(1);
    }
    Ok(())
}
