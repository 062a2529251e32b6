//! Terminal rendering helpers for council results and scan reports.

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::models::{Completion, ScanReport};

/// Spinner shown while the council is in flight.
pub fn council_spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner());
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Print one council member's result.
pub fn print_completion(completion: &Completion) {
    if let Some(error) = &completion.error {
        println!(
            "{} {}",
            style(format!("[{}]", completion.endpoint)).red().bold(),
            style(error).red()
        );
    } else {
        println!(
            "{}",
            style(format!("[{} ({})]", completion.endpoint, completion.model))
                .cyan()
                .bold()
        );
        println!("{}", completion.content);
    }
    println!();
}

/// Print a configuration or council-assembly warning.
pub fn print_warning(message: &str) {
    eprintln!("{} {message}", style("warning:").yellow().bold());
}

/// Render findings as a table, sorted the way the report orders them.
pub fn findings_table(report: &ScanReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Severity", "File", "Line", "Message", "Rule"]);

    for finding in &report.findings {
        table.add_row(vec![
            finding.severity.to_string(),
            finding.file.clone(),
            finding.line.to_string(),
            finding.message.clone(),
            finding.rule.clone(),
        ]);
    }

    table
}
