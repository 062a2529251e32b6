//! Client for the quality-gate server.
//!
//! One scan is a three-step state machine: spawn the external scanner and
//! extract a task id from its output, poll the compute-engine task endpoint
//! until a terminal state, then page through the issue-search endpoint until
//! every finding is retrieved.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tokio::process::Command;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use super::error::ScanError;
use crate::domain::models::{Finding, ScanReport, Severity, TaskStatus};

/// Timeout for individual HTTP calls to the quality server. Distinct from
/// the wall-clock polling budget.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the quality server.
#[derive(Debug, Clone)]
pub struct QualityGateConfig {
    /// Server base URL without a trailing slash.
    pub base_url: String,
    /// Auth token, sent as the basic-auth username when present.
    pub token: Option<String>,
    /// Scanner binary spawned to submit an analysis.
    pub scanner_command: String,
    /// Delay between task status polls.
    pub poll_interval: Duration,
    /// Wall-clock budget for one analysis task.
    pub task_timeout: Duration,
    /// Findings fetched per page.
    pub page_size: usize,
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            token: None,
            scanner_command: "sonar-scanner".to_string(),
            poll_interval: Duration::from_secs(2),
            task_timeout: Duration::from_secs(300),
            page_size: 500,
        }
    }
}

/// Client for one quality server.
pub struct QualityGateClient {
    config: QualityGateConfig,
    http: Client,
}

impl QualityGateClient {
    pub fn new(config: QualityGateConfig) -> Result<Self, ScanError> {
        let mut config = config;
        while config.base_url.ends_with('/') {
            config.base_url.pop();
        }
        let http = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self { config, http })
    }

    /// Run the scanner subprocess in `project_dir` and return the submitted
    /// task id. A non-zero exit is fatal, with the captured output attached.
    pub async fn submit(&self, project_dir: &Path) -> Result<String, ScanError> {
        info!(scanner = %self.config.scanner_command, dir = %project_dir.display(), "submitting scan");

        let output = Command::new(&self.config.scanner_command)
            .current_dir(project_dir)
            .output()
            .await?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(ScanError::ScannerFailed(combined));
        }

        let task_id = parse_task_id(&combined).ok_or(ScanError::MissingTaskId)?;
        info!(task_id = %task_id, "scan submitted");
        Ok(task_id)
    }

    /// Poll the task until it succeeds. `FAILED` and `CANCELED` raise
    /// immediately; unknown statuses keep the poll running; exceeding the
    /// wall-clock budget raises a timeout. One poll in flight at a time.
    pub async fn wait_for_task(&self, task_id: &str) -> Result<(), ScanError> {
        let started = Instant::now();

        loop {
            if started.elapsed() >= self.config.task_timeout {
                return Err(ScanError::Timeout(self.config.task_timeout));
            }

            match self.fetch_task_status(task_id).await? {
                Some(TaskStatus::Success) => {
                    info!(task_id = %task_id, "analysis complete");
                    return Ok(());
                }
                Some(status @ (TaskStatus::Failed | TaskStatus::Canceled)) => {
                    return Err(ScanError::AnalysisEnded(status));
                }
                other => {
                    debug!(
                        task_id = %task_id,
                        status = ?other,
                        elapsed_secs = started.elapsed().as_secs(),
                        "analysis in progress"
                    );
                    sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    async fn fetch_task_status(&self, task_id: &str) -> Result<Option<TaskStatus>, ScanError> {
        let url = format!("{}/api/ce/task", self.config.base_url);
        let mut request = self.http.get(url).query(&[("id", task_id)]);
        if let Some(token) = &self.config.token {
            request = request.basic_auth(token, Some(""));
        }

        let data: Value = request.send().await?.error_for_status()?.json().await?;
        let status = data
            .pointer("/task/status")
            .and_then(Value::as_str)
            .and_then(TaskStatus::from_api);
        Ok(status)
    }

    /// Page through the issue-search endpoint, accumulating findings until
    /// the server-reported total is reached.
    pub async fn fetch_findings(&self, project_key: &str) -> Result<ScanReport, ScanError> {
        let url = format!("{}/api/issues/search", self.config.base_url);
        let mut findings: Vec<Finding> = Vec::new();
        let mut page: usize = 1;

        loop {
            let page_size = self.config.page_size.to_string();
            let page_number = page.to_string();
            let mut request = self.http.get(&url).query(&[
                ("componentKeys", project_key),
                ("resolved", "false"),
                ("ps", page_size.as_str()),
                ("p", page_number.as_str()),
            ]);
            if let Some(token) = &self.config.token {
                request = request.basic_auth(token, Some(""));
            }

            let data: Value = request.send().await?.error_for_status()?.json().await?;

            if let Some(issues) = data.get("issues").and_then(Value::as_array) {
                findings.extend(issues.iter().map(parse_finding));
            }

            let total = data
                .get("total")
                .and_then(Value::as_u64)
                .and_then(|t| usize::try_from(t).ok())
                .unwrap_or(0);
            if findings.len() >= total {
                break;
            }
            page += 1;
        }

        debug!(project_key = %project_key, count = findings.len(), "findings retrieved");
        Ok(ScanReport::new(project_key, findings))
    }

    /// Submit, wait, and fetch in one call.
    pub async fn scan_and_wait(
        &self,
        project_dir: &Path,
        project_key: &str,
    ) -> Result<ScanReport, ScanError> {
        let task_id = self.submit(project_dir).await?;
        self.wait_for_task(&task_id).await?;
        self.fetch_findings(project_key).await
    }
}

/// Extract the task id from scanner output: the token following the first
/// `task?id=` marker, up to whitespace.
fn parse_task_id(output: &str) -> Option<String> {
    for line in output.lines() {
        if let Some(index) = line.find("task?id=") {
            let rest = &line[index + "task?id=".len()..];
            let id = rest.split_whitespace().next().unwrap_or_default();
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
    }
    None
}

/// Map one issue object to a [`Finding`]. The file path is the component
/// suffix after the last colon; the line falls back to the text range start.
fn parse_finding(item: &Value) -> Finding {
    let component = item
        .get("component")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let file = component
        .rsplit_once(':')
        .map_or(component, |(_, suffix)| suffix)
        .to_string();

    let line = item
        .get("line")
        .and_then(Value::as_u64)
        .or_else(|| item.pointer("/textRange/startLine").and_then(Value::as_u64))
        .and_then(|l| u32::try_from(l).ok())
        .unwrap_or(0);

    Finding {
        rule: item
            .get("rule")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        severity: Severity::from_api(
            item.get("severity").and_then(Value::as_str).unwrap_or(""),
        ),
        message: item
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        file,
        line,
        effort: item
            .get("effort")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}
