//! Serde configuration tree, merged by the figment-based loader.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Endpoint pool and council membership.
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Quality-gate server connection.
    #[serde(default)]
    pub quality: QualityConfig,

    /// Convergence loop defaults.
    #[serde(default)]
    pub convergence: ConvergenceSettings,
}

/// Endpoint pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EndpointsConfig {
    /// Endpoint names queried by default for a council request.
    #[serde(default = "default_council")]
    pub default_council: Vec<String>,

    /// Request timeout applied to every endpoint, seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Additional attempts after the first, applied to every endpoint.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-endpoint settings, keyed by endpoint kind name.
    #[serde(default)]
    pub endpoints: BTreeMap<String, EndpointSettings>,
}

fn default_council() -> Vec<String> {
    vec!["openai".to_string(), "anthropic".to_string()]
}

const fn default_timeout_secs() -> u64 {
    60
}

const fn default_max_retries() -> u32 {
    2
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            default_council: default_council(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            endpoints: BTreeMap::new(),
        }
    }
}

impl EndpointsConfig {
    /// Settings for the named endpoint with the pool-wide timeout and retry
    /// budget applied, or `None` when the endpoint is unconfigured.
    pub fn resolved_settings(&self, name: &str) -> Option<EndpointSettings> {
        let mut settings = self.endpoints.get(name)?.clone();
        settings.timeout_secs = self.timeout_secs;
        settings.max_retries = self.max_retries;
        Some(settings)
    }
}

/// Settings for a single endpoint.
///
/// String values may be environment placeholders (`${VAR}` or
/// `${VAR:default}`); they are resolved when the endpoint is built, not
/// when the config is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EndpointSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub base_url: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

const fn default_enabled() -> bool {
    true
}

const fn default_max_tokens() -> u32 {
    4096
}

const fn default_temperature() -> f32 {
    0.7
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            api_key: String::new(),
            model: String::new(),
            base_url: String::new(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Quality-gate server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QualityConfig {
    #[serde(default = "default_quality_url")]
    pub base_url: String,

    /// Server token; sent as HTTP basic auth username when present.
    #[serde(default)]
    pub token: Option<String>,

    /// Scanner binary spawned to submit an analysis.
    #[serde(default = "default_scanner_command")]
    pub scanner_command: String,

    /// Delay between task status polls, seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Wall-clock budget for one analysis task, seconds.
    #[serde(default = "default_task_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_quality_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_scanner_command() -> String {
    "sonar-scanner".to_string()
}

const fn default_poll_interval_secs() -> u64 {
    2
}

const fn default_task_timeout_secs() -> u64 {
    300
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            base_url: default_quality_url(),
            token: None,
            scanner_command: default_scanner_command(),
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: default_task_timeout_secs(),
        }
    }
}

/// Convergence loop defaults, overridable per run from the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConvergenceSettings {
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_language() -> String {
    "python".to_string()
}

const fn default_max_iterations() -> u32 {
    5
}

impl Default for ConvergenceSettings {
    fn default() -> Self {
        Self {
            language: default_language(),
            max_iterations: default_max_iterations(),
        }
    }
}
