//! `quorum scan` -- run or fetch a quality scan without fixing anything.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::cli::display;
use crate::domain::models::Config;
use crate::infrastructure::quality::{QualityGateClient, QualityGateConfig};

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Quality server project key
    pub project_key: String,

    /// Run the scanner in this directory before fetching findings
    #[arg(long)]
    pub scan_dir: Option<PathBuf>,
}

pub async fn execute(args: ScanArgs, config: Config) -> Result<()> {
    let client = QualityGateClient::new(QualityGateConfig {
        base_url: config.quality.base_url.clone(),
        token: config.quality.token.clone(),
        scanner_command: config.quality.scanner_command.clone(),
        poll_interval: Duration::from_secs(config.quality.poll_interval_secs),
        task_timeout: Duration::from_secs(config.quality.timeout_secs),
        ..Default::default()
    })?;

    let report = match &args.scan_dir {
        Some(dir) => client.scan_and_wait(dir, &args.project_key).await?,
        None => client.fetch_findings(&args.project_key).await?,
    };

    if report.passed() {
        println!("Quality gate passed: no findings for {}", report.project_key);
        return Ok(());
    }

    println!("{}", display::findings_table(&report));
    println!("\nStatus: {}", report.format_summary());
    std::process::exit(1);
}
