//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use quorum::{Completion, Endpoint, Turn};

/// Endpoint stub returning a canned outcome, optionally after a delay.
#[derive(Debug)]
pub struct StaticEndpoint {
    pub name: String,
    pub model: String,
    pub outcome: Result<String, String>,
    pub delay: Duration,
}

impl StaticEndpoint {
    pub fn ok(name: &str, content: &str) -> Self {
        Self {
            name: name.to_string(),
            model: format!("{name}-model"),
            outcome: Ok(content.to_string()),
            delay: Duration::ZERO,
        }
    }

    pub fn failing(name: &str, error: &str) -> Self {
        Self {
            name: name.to_string(),
            model: format!("{name}-model"),
            outcome: Err(error.to_string()),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Endpoint for StaticEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, _turns: &[Turn], _system: &str) -> Completion {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.outcome {
            Ok(content) => Completion::success(&self.name, &self.model, content.clone(), None),
            Err(error) => Completion::failure(&self.name, &self.model, error.clone()),
        }
    }

    async fn close(&self) {}
}

/// Write an executable stand-in for the scanner binary that prints the
/// given output and exits with `exit_code`.
#[cfg(unix)]
pub fn write_fake_scanner(dir: &Path, output: &str, exit_code: i32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-scanner");
    let script = format!("#!/bin/sh\ncat <<'EOF'\n{output}\nEOF\nexit {exit_code}\n");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
