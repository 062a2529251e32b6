//! `quorum ask` -- query the council.

use anyhow::{bail, Result};
use clap::Args;

use crate::cli::display;
use crate::domain::models::{Completion, Config, Turn};
use crate::infrastructure::endpoints::build_council;
use crate::services::{analysis, council};

/// Cap on query length, to catch accidental pastes of whole files.
const MAX_QUERY_LENGTH: usize = 32_000;

#[derive(Debug, Args)]
pub struct AskArgs {
    /// Question to put to the council
    #[arg(required_unless_present = "list_debias")]
    pub query: Option<String>,

    /// System prompt sent to every member
    #[arg(long)]
    pub system: Option<String>,

    /// Comma-separated debiasing techniques to run on the combined answer
    #[arg(long, short = 'd')]
    pub debias: Option<String>,

    /// Skip variance analysis
    #[arg(long)]
    pub no_variance: bool,

    /// List available debiasing techniques and exit
    #[arg(long)]
    pub list_debias: bool,
}

pub async fn execute(args: AskArgs, config: Config) -> Result<()> {
    if args.list_debias {
        println!("Available debiasing techniques:");
        for technique in analysis::available_techniques() {
            println!("  {technique}");
        }
        return Ok(());
    }

    let Some(query) = args.query else {
        bail!("please provide a query");
    };
    if query.len() > MAX_QUERY_LENGTH {
        bail!("query too long (maximum {MAX_QUERY_LENGTH} characters)");
    }

    let (endpoints, warnings) = build_council(&config.endpoints);
    for warning in &warnings {
        display::print_warning(warning);
    }
    if endpoints.is_empty() {
        bail!("no endpoints available; check your API keys and configuration");
    }

    let system = args.system.unwrap_or_default();
    let turns = [Turn::user(query)];

    let spinner = display::council_spinner(format!("Querying {} models...", endpoints.len()));
    let completions = council::dispatch(&endpoints, &turns, &system).await;
    spinner.finish_and_clear();

    for completion in &completions {
        display::print_completion(completion);
    }

    let successful: Vec<&Completion> = completions.iter().filter(|c| c.ok()).collect();

    if !args.no_variance && successful.len() > 1 {
        let report = analysis::analyze_variance(&completions, &endpoints[0]).await;
        println!("{}\n", report.format());
    }

    if let Some(debias) = &args.debias {
        if !successful.is_empty() {
            let techniques: Vec<String> =
                debias.split(',').map(|t| t.trim().to_string()).collect();
            let combined = successful
                .iter()
                .map(|c| format!("**{}**: {}", c.endpoint, c.content))
                .collect::<Vec<_>>()
                .join("\n\n---\n\n");
            let results = analysis::run_debiasing(&combined, &techniques, &endpoints[0], "").await;
            println!("{}", analysis::format_debias_results(&results));
        }
    }

    council::close_all(&endpoints).await;
    Ok(())
}
