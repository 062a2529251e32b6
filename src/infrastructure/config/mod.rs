//! Configuration loading with hierarchical merging.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid max_iterations: {0}. Must be at least 1")]
    InvalidMaxIterations(u32),

    #[error("invalid timeout_secs: {0}. Must be positive")]
    InvalidTimeout(u64),

    #[error("invalid poll_interval_secs: {0}. Must be positive")]
    InvalidPollInterval(u64),

    #[error("quality base_url cannot be empty")]
    EmptyQualityUrl,

    #[error("default_council cannot be empty")]
    EmptyCouncil,
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. quorum.yaml in the working directory
    /// 3. Environment variables (`QUORUM_*` prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file("quorum.yaml"))
            .merge(Env::prefixed("QUORUM_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.convergence.max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations(
                config.convergence.max_iterations,
            ));
        }

        if config.endpoints.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(config.endpoints.timeout_secs));
        }

        if config.quality.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(config.quality.timeout_secs));
        }

        if config.quality.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidPollInterval(
                config.quality.poll_interval_secs,
            ));
        }

        if config.quality.base_url.is_empty() {
            return Err(ConfigError::EmptyQualityUrl);
        }

        if config.endpoints.default_council.is_empty() {
            return Err(ConfigError::EmptyCouncil);
        }

        Ok(())
    }
}
