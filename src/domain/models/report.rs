//! Quality-gate scan reports: task states, findings, and severities.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of one analysis task on the quality server.
///
/// Transitions are observed by polling only. `Success`, `Failed`, and
/// `Canceled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Success,
    Failed,
    Canceled,
}

impl TaskStatus {
    /// Parse the status string the server reports. Unrecognized values
    /// return `None`; the poll loop treats those like a pending task.
    pub fn from_api(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(Self::Pending),
            "IN_PROGRESS" => Some(Self::InProgress),
            "SUCCESS" => Some(Self::Success),
            "FAILED" => Some(Self::Failed),
            "CANCELED" => Some(Self::Canceled),
            _ => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Canceled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Canceled => "CANCELED",
        };
        f.write_str(name)
    }
}

/// Issue severity as reported by the quality server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Blocker,
    Critical,
    Major,
    Minor,
    Info,
}

impl Severity {
    /// Parse a severity string, defaulting to `Info` for unknown values.
    pub fn from_api(value: &str) -> Self {
        match value {
            "BLOCKER" => Self::Blocker,
            "CRITICAL" => Self::Critical,
            "MAJOR" => Self::Major,
            "MINOR" => Self::Minor,
            _ => Self::Info,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Blocker => "BLOCKER",
            Self::Critical => "CRITICAL",
            Self::Major => "MAJOR",
            Self::Minor => "MINOR",
            Self::Info => "INFO",
        };
        f.write_str(name)
    }
}

/// One reported code issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    /// Path relative to the scanned project root.
    pub file: String,
    pub line: u32,
    #[serde(default)]
    pub effort: String,
}

impl Finding {
    /// One-line rendering used in tables and logs.
    pub fn format(&self) -> String {
        format!(
            "[{}] {}:{} - {} (rule: {})",
            self.severity, self.file, self.line, self.message, self.rule
        )
    }
}

/// Full set of unresolved findings for a project after one scan.
///
/// Never mutated; iterations of the convergence loop compare reports by
/// finding count only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub project_key: String,
    pub findings: Vec<Finding>,
}

impl ScanReport {
    pub fn new(project_key: impl Into<String>, findings: Vec<Finding>) -> Self {
        Self {
            project_key: project_key.into(),
            findings,
        }
    }

    /// The quality gate passes when no findings remain.
    pub fn passed(&self) -> bool {
        self.findings.is_empty()
    }

    /// Count of blocker and critical findings.
    pub fn critical_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| matches!(f.severity, Severity::Blocker | Severity::Critical))
            .count()
    }

    pub fn major_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Major)
            .count()
    }

    /// Render findings grouped by file and sorted by line, in a shape a
    /// model can act on.
    pub fn format_for_model(&self) -> String {
        if self.passed() {
            return "No issues found. Code is clean.".to_string();
        }

        let mut lines = vec![
            format!(
                "Found {} issues ({} critical, {} major):",
                self.findings.len(),
                self.critical_count(),
                self.major_count()
            ),
            String::new(),
        ];

        let mut by_file: BTreeMap<&str, Vec<&Finding>> = BTreeMap::new();
        for finding in &self.findings {
            by_file.entry(finding.file.as_str()).or_default().push(finding);
        }

        for (file, mut file_findings) in by_file {
            lines.push(format!("## {file}"));
            file_findings.sort_by_key(|f| f.line);
            for (i, finding) in file_findings.iter().enumerate() {
                lines.push(format!(
                    "{}. Line {}: [{}] {}",
                    i + 1,
                    finding.line,
                    finding.severity,
                    finding.message
                ));
                lines.push(format!("   Rule: {}", finding.rule));
            }
            lines.push(String::new());
        }

        lines.push("Please fix these issues and ensure the code follows best practices.".to_string());
        lines.join("\n")
    }

    /// Short status line for logs.
    pub fn format_summary(&self) -> String {
        if self.passed() {
            "clean".to_string()
        } else {
            format!(
                "{} issues ({} critical)",
                self.findings.len(),
                self.critical_count()
            )
        }
    }
}
