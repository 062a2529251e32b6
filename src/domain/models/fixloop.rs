//! Result records for the convergence loop and per-language linter profiles.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::report::ScanReport;

/// Outcome of one linter invocation within one loop iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinterOutcome {
    /// Linter binary name (first token of the configured command).
    pub linter: String,
    /// True on exit code 0, and also when the binary was absent (skipped).
    pub passed: bool,
    /// Combined stdout/stderr, unstructured.
    pub output: String,
}

/// Record of one iteration of the convergence loop. Append-only: never
/// mutated once the iteration completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopIteration {
    /// 1-based iteration index.
    pub index: u32,
    pub linter_outcomes: Vec<LinterOutcome>,
    pub scan_report: Option<ScanReport>,
    pub fixes_applied: bool,
    /// Fatal error captured for this iteration; set only when the loop is
    /// about to terminate early.
    pub error: Option<String>,
}

impl LoopIteration {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            linter_outcomes: Vec::new(),
            scan_report: None,
            fixes_applied: false,
            error: None,
        }
    }

    /// An iteration passes when every linter passed and the scan report,
    /// if present, is clean.
    pub fn passed(&self) -> bool {
        let linters_ok = self.linter_outcomes.iter().all(|o| o.passed);
        let scan_ok = self.scan_report.as_ref().is_none_or(ScanReport::passed);
        linters_ok && scan_ok
    }
}

/// Final result of one convergence loop invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoopResult {
    pub iterations: Vec<LoopIteration>,
    pub final_passed: bool,
    pub total_issues_fixed: usize,
}

impl LoopResult {
    /// Multi-line human-readable summary of the whole run.
    pub fn format_summary(&self) -> String {
        let status = if self.final_passed { "PASSED" } else { "FAILED" };
        let mut lines = vec![
            format!("## Convergence loop {status}"),
            format!("Iterations: {}", self.iterations.len()),
            format!("Total issues fixed: {}", self.total_issues_fixed),
            String::new(),
        ];

        for iteration in &self.iterations {
            let mark = if iteration.passed() { "ok" } else { "failed" };
            lines.push(format!("### Iteration {} [{mark}]", iteration.index));
            for outcome in &iteration.linter_outcomes {
                let mark = if outcome.passed { "ok" } else { "failed" };
                lines.push(format!("  - {}: {mark}", outcome.linter));
            }
            if let Some(report) = &iteration.scan_report {
                lines.push(format!("  - quality gate: {}", report.format_summary()));
            }
            if let Some(error) = &iteration.error {
                lines.push(format!("  - error: {error}"));
            }
            lines.push(String::new());
        }

        lines.join("\n")
    }
}

/// Linter commands and file extensions for one language ecosystem.
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    /// Shell commands run sequentially each iteration.
    pub linters: Vec<String>,
    /// Extensions used when scraping file paths out of linter output.
    pub extensions: Vec<String>,
}

impl LanguageProfile {
    pub fn python() -> Self {
        Self {
            linters: vec!["ruff check --fix".to_string(), "ruff format".to_string()],
            extensions: vec![".py".to_string()],
        }
    }

    pub fn ansible() -> Self {
        Self {
            linters: vec!["ansible-lint --fix".to_string()],
            extensions: vec![".yml".to_string(), ".yaml".to_string()],
        }
    }

    pub fn terraform() -> Self {
        Self {
            linters: vec!["terraform fmt -recursive".to_string(), "tflint".to_string()],
            extensions: vec![".tf".to_string()],
        }
    }

    /// Profile for a language name; unknown names fall back to python,
    /// mirroring the default the tool started with.
    pub fn for_language(language: &str) -> Self {
        match language {
            "ansible" => Self::ansible(),
            "terraform" => Self::terraform(),
            _ => Self::python(),
        }
    }

    /// Fence label for a file path, used when embedding file content in a
    /// fix prompt. Unknown extensions get an unlabeled fence.
    pub fn fence_label(path: &Path) -> &'static str {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "py" => "python",
            "tf" => "terraform",
            "yml" | "yaml" => "yaml",
            "sh" => "bash",
            "js" => "javascript",
            "ts" => "typescript",
            "rs" => "rust",
            _ => "",
        }
    }
}
