//! Endpoint factory and council assembly.
//!
//! Maps provider kind names to endpoint variants and builds the configured
//! council (or a single fixer endpoint) from an [`EndpointsConfig`].

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::{AnthropicEndpoint, Endpoint, GoogleEndpoint, OllamaEndpoint, OpenAiEndpoint};
use crate::domain::models::{EndpointSettings, EndpointsConfig};

/// Provider kinds the registry can build.
pub const AVAILABLE_KINDS: [&str; 4] = ["openai", "anthropic", "google", "ollama"];

/// Preference order when a single fix endpoint is needed.
const FIXER_PREFERENCE: [&str; 3] = ["anthropic", "openai", "google"];

/// Errors raised while assembling endpoints from configuration.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown endpoint kind: {0} (available: openai, anthropic, google, ollama)")]
    UnknownKind(String),

    #[error("no enabled fix endpoint configured (looked for: anthropic, openai, google)")]
    NoFixerConfigured,
}

/// Build one endpoint of the named kind.
pub fn build_endpoint(
    kind: &str,
    settings: &EndpointSettings,
) -> Result<Arc<dyn Endpoint>, RegistryError> {
    match kind {
        "openai" => Ok(Arc::new(OpenAiEndpoint::new(settings))),
        "anthropic" => Ok(Arc::new(AnthropicEndpoint::new(settings))),
        "google" => Ok(Arc::new(GoogleEndpoint::new(settings))),
        "ollama" => Ok(Arc::new(OllamaEndpoint::new(settings))),
        other => Err(RegistryError::UnknownKind(other.to_string())),
    }
}

/// Build the council from config.
///
/// Unconfigured or unknown members produce warnings rather than failing the
/// whole council; disabled members are silently skipped. Pool-wide timeout
/// and retry budgets are applied to every member.
pub fn build_council(config: &EndpointsConfig) -> (Vec<Arc<dyn Endpoint>>, Vec<String>) {
    let mut endpoints: Vec<Arc<dyn Endpoint>> = Vec::new();
    let mut warnings = Vec::new();

    for name in &config.default_council {
        let Some(settings) = config.resolved_settings(name) else {
            warnings.push(format!("{name}: not configured"));
            continue;
        };
        if !settings.enabled {
            debug!(endpoint = %name, "endpoint disabled, skipping");
            continue;
        }
        match build_endpoint(name, &settings) {
            Ok(endpoint) => endpoints.push(endpoint),
            Err(err) => warnings.push(format!("{name}: {err}")),
        }
    }

    (endpoints, warnings)
}

/// Pick the single endpoint used for fix requests: the first configured and
/// enabled provider in preference order.
pub fn build_fixer(config: &EndpointsConfig) -> Result<Arc<dyn Endpoint>, RegistryError> {
    for name in FIXER_PREFERENCE {
        if let Some(settings) = config.resolved_settings(name) {
            if settings.enabled {
                return build_endpoint(name, &settings);
            }
        }
    }
    Err(RegistryError::NoFixerConfigured)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(names: &[&str]) -> EndpointsConfig {
        let mut config = EndpointsConfig::default();
        config.default_council = names.iter().map(ToString::to_string).collect();
        for name in names {
            config
                .endpoints
                .insert((*name).to_string(), EndpointSettings::default());
        }
        config
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = build_endpoint("watson", &EndpointSettings::default()).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownKind(_)));
    }

    #[test]
    fn council_preserves_member_order() {
        let config = config_with(&["ollama", "openai"]);
        let (endpoints, warnings) = build_council(&config);
        assert!(warnings.is_empty());
        let names: Vec<&str> = endpoints.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["ollama", "openai"]);
    }

    #[test]
    fn unconfigured_member_becomes_a_warning() {
        let mut config = config_with(&["openai"]);
        config.default_council.push("anthropic".to_string());
        let (endpoints, warnings) = build_council(&config);
        assert_eq!(endpoints.len(), 1);
        assert_eq!(warnings, vec!["anthropic: not configured".to_string()]);
    }

    #[test]
    fn disabled_member_is_skipped_silently() {
        let mut config = config_with(&["openai", "ollama"]);
        if let Some(settings) = config.endpoints.get_mut("ollama") {
            settings.enabled = false;
        }
        let (endpoints, warnings) = build_council(&config);
        assert_eq!(endpoints.len(), 1);
        assert!(warnings.is_empty());
    }

    #[test]
    fn fixer_follows_preference_order() {
        let config = config_with(&["google", "anthropic"]);
        let fixer = build_fixer(&config).unwrap();
        assert_eq!(fixer.name(), "anthropic");
    }

    #[test]
    fn fixer_requires_an_enabled_candidate() {
        let config = config_with(&["ollama"]);
        assert!(matches!(
            build_fixer(&config),
            Err(RegistryError::NoFixerConfigured)
        ));
    }
}
