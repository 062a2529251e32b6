//! The convergence loop: iterate lint → scan → model-fix until the quality
//! gate passes or the iteration budget is exhausted.
//!
//! Strictly sequential everywhere: across iterations, across linters within
//! an iteration, and across per-file fix requests. The working tree is
//! mutated only by the fix-application step, so concurrent loop invocations
//! against one project directory are not supported.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::process::Command;
use tracing::{error, info, warn};

use crate::domain::models::{
    LanguageProfile, LinterOutcome, LoopIteration, LoopResult, ScanReport, Turn,
};
use crate::infrastructure::endpoints::Endpoint;
use crate::infrastructure::logging::redact_secrets;
use crate::infrastructure::quality::QualityGateClient;

/// Suffix appended to a file name before it is overwritten with a fix.
const BACKUP_SUFFIX: &str = ".bak";

/// Per-run parameters of the loop.
#[derive(Debug, Clone)]
pub struct ConvergenceParams {
    pub project_dir: PathBuf,
    pub project_key: String,
    pub max_iterations: u32,
}

/// Orchestrates iterative code fixes until the quality gate passes.
pub struct ConvergenceLoop {
    quality: QualityGateClient,
    fixer: Arc<dyn Endpoint>,
    profile: LanguageProfile,
    params: ConvergenceParams,
}

impl ConvergenceLoop {
    pub fn new(
        quality: QualityGateClient,
        fixer: Arc<dyn Endpoint>,
        profile: LanguageProfile,
        params: ConvergenceParams,
    ) -> Self {
        Self {
            quality,
            fixer,
            profile,
            params,
        }
    }

    /// Run until clean, fatal error, or budget exhaustion.
    pub async fn run(&self) -> LoopResult {
        let mut result = LoopResult::default();

        for index in 1..=self.params.max_iterations {
            info!(
                iteration = index,
                max_iterations = self.params.max_iterations,
                "starting iteration"
            );

            let iteration = self.run_iteration(index).await;

            if iteration.passed() {
                info!(iteration = index, "all checks passed");
                result.iterations.push(iteration);
                result.final_passed = true;
                break;
            }

            if let Some(message) = &iteration.error {
                error!(iteration = index, error = %message, "iteration failed");
                result.iterations.push(iteration);
                break;
            }

            // Score the previous iteration's progress. The terminal passing
            // iteration never reaches this point, so its resolution is not
            // counted; a regression contributes zero, not a negative.
            let previous_count = result
                .iterations
                .last()
                .and_then(|it| it.scan_report.as_ref())
                .map(|report| report.findings.len());
            let current_count = iteration.scan_report.as_ref().map(|r| r.findings.len());
            if let (Some(previous), Some(current)) = (previous_count, current_count) {
                result.total_issues_fixed += previous.saturating_sub(current);
            }

            result.iterations.push(iteration);
        }

        result
    }

    /// One iteration: linters, scan, and (when dirty) fix requests.
    async fn run_iteration(&self, index: u32) -> LoopIteration {
        let mut iteration = LoopIteration::new(index);

        iteration.linter_outcomes = self.run_linters().await;

        match self
            .quality
            .scan_and_wait(&self.params.project_dir, &self.params.project_key)
            .await
        {
            Ok(report) => iteration.scan_report = Some(report),
            Err(err) => {
                iteration.error = Some(redact_secrets(&err.to_string()));
                return iteration;
            }
        }

        if !iteration.passed() {
            match self
                .apply_fixes(&iteration.linter_outcomes, iteration.scan_report.as_ref())
                .await
            {
                Ok(applied) => iteration.fixes_applied = applied,
                Err(err) => iteration.error = Some(redact_secrets(&err.to_string())),
            }
        }

        iteration
    }

    async fn run_linters(&self) -> Vec<LinterOutcome> {
        let mut outcomes = Vec::with_capacity(self.profile.linters.len());
        for command in &self.profile.linters {
            outcomes.push(self.run_linter(command).await);
        }
        outcomes
    }

    /// Run one linter shell command. A missing binary is a pass-through
    /// skip, not a failure.
    async fn run_linter(&self, command: &str) -> LinterOutcome {
        let linter = command
            .split_whitespace()
            .next()
            .unwrap_or(command)
            .to_string();

        if !binary_on_path(&linter) {
            warn!(linter = %linter, "linter not installed, skipping");
            return LinterOutcome {
                passed: true,
                output: format!("{linter} not installed, skipping"),
                linter,
            };
        }

        match Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.params.project_dir)
            .output()
            .await
        {
            Ok(output) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                LinterOutcome {
                    linter,
                    passed: output.status.success(),
                    output: combined,
                }
            }
            Err(err) => LinterOutcome {
                linter,
                passed: false,
                output: err.to_string(),
            },
        }
    }

    /// Ask the fix endpoint for every implicated file, applying whatever
    /// comes back. Returns whether any request round was issued.
    async fn apply_fixes(
        &self,
        outcomes: &[LinterOutcome],
        report: Option<&ScanReport>,
    ) -> Result<bool, std::io::Error> {
        let files = files_with_issues(&self.profile, outcomes, report);
        if files.is_empty() {
            warn!("no files identified for fixing");
            return Ok(false);
        }

        let context = build_fix_context(outcomes, report);
        for file in &files {
            self.fix_single_file(file, &context).await?;
        }

        Ok(true)
    }

    /// Request and apply a fix for one file. The file is rewritten only
    /// when the response carries a fenced block that differs from the
    /// current content; the original is backed up first.
    async fn fix_single_file(
        &self,
        relative_path: &str,
        context: &str,
    ) -> Result<bool, std::io::Error> {
        let full_path = self.params.project_dir.join(relative_path);
        if !full_path.exists() {
            return Ok(false);
        }

        let original = tokio::fs::read_to_string(&full_path).await?;
        let label = LanguageProfile::fence_label(&full_path);
        let prompt = format!(
            "{context}\n\n## File to fix: {relative_path}\n\n```{label}\n{original}\n```\n\n\
             Provide the complete fixed file content. Only output the code, no explanations.\n\
             Wrap the code in triple backticks with the language identifier."
        );

        let turns = [Turn::user(prompt)];
        let completion = self.fixer.complete(&turns, "").await;
        if !completion.ok() || completion.content.is_empty() {
            return Ok(false);
        }

        let Some(fixed) = extract_fenced_block(&completion.content) else {
            return Ok(false);
        };
        if fixed == original {
            return Ok(false);
        }

        let backup = backup_path(&full_path);
        tokio::fs::write(&backup, &original).await?;
        tokio::fs::write(&full_path, &fixed).await?;
        info!(file = %relative_path, "applied fix");
        Ok(true)
    }
}

/// Union of files implicated by findings and by scraping non-passing
/// linter output, sorted for a deterministic fix order.
fn files_with_issues(
    profile: &LanguageProfile,
    outcomes: &[LinterOutcome],
    report: Option<&ScanReport>,
) -> Vec<String> {
    let mut files: BTreeSet<String> = BTreeSet::new();

    if let Some(report) = report {
        files.extend(report.findings.iter().map(|f| f.file.clone()));
    }

    for outcome in outcomes {
        files.extend(scrape_linter_files(profile, outcome));
    }

    files.into_iter().collect()
}

/// Heuristic path scrape from linter output: `<path>:...` lines whose path
/// carries one of the profile's extensions. Indented continuation lines are
/// skipped.
fn scrape_linter_files(profile: &LanguageProfile, outcome: &LinterOutcome) -> BTreeSet<String> {
    let mut files = BTreeSet::new();
    if outcome.passed || outcome.output.is_empty() {
        return files;
    }

    for line in outcome.output.lines() {
        if !line.contains(':') || line.starts_with(' ') {
            continue;
        }
        let candidate = line.split(':').next().unwrap_or_default().trim();
        if profile
            .extensions
            .iter()
            .any(|ext| candidate.ends_with(ext.as_str()))
        {
            files.insert(candidate.to_string());
        }
    }

    files
}

/// Context shared by every fix request of one iteration: failing linter
/// output plus the findings rendered for the model.
fn build_fix_context(outcomes: &[LinterOutcome], report: Option<&ScanReport>) -> String {
    let mut parts = vec!["Fix the following issues in the code:\n".to_string()];

    for outcome in outcomes {
        if !outcome.passed {
            parts.push(format!("## {} issues:\n{}\n", outcome.linter, outcome.output));
        }
    }

    if let Some(report) = report {
        if !report.passed() {
            parts.push(report.format_for_model());
        }
    }

    parts.join("\n")
}

/// First fenced code block of a response, verbatim, without the fence
/// markers. `None` when the response has no non-empty block.
pub fn extract_fenced_block(response: &str) -> Option<String> {
    let mut in_block = false;
    let mut lines: Vec<&str> = Vec::new();

    for line in response.lines() {
        if line.starts_with("```") {
            if in_block {
                break;
            }
            in_block = true;
            continue;
        }
        if in_block {
            lines.push(line);
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn backup_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}{BACKUP_SUFFIX}", path.display()))
}

/// Whether an executable with this name exists on `PATH`.
fn binary_on_path(name: &str) -> bool {
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| dir.join(name).is_file())
}
