//! Quorum -- multi-model council with a quality-gate convergence loop.
//!
//! Quorum fans one request out to several LLM endpoints concurrently and
//! can drive a project through iterative lint → scan → model-fix cycles
//! until an external quality gate passes.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): pure data types, no I/O
//! - **Service Layer** (`services`): council fan-out, convergence loop,
//!   response analysis
//! - **Infrastructure Layer** (`infrastructure`): endpoint clients, the
//!   quality-server client, configuration, redaction
//! - **CLI Layer** (`cli`): command-line interface

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Completion, Config, ConvergenceSettings, EndpointSettings, EndpointsConfig, Finding,
    LanguageProfile, LinterOutcome, LoopIteration, LoopResult, QualityConfig, Role, ScanReport,
    Severity, TaskStatus, Turn,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::endpoints::{
    build_council, build_endpoint, build_fixer, Endpoint, RegistryError,
};
pub use infrastructure::logging::redact_secrets;
pub use infrastructure::quality::{QualityGateClient, QualityGateConfig, ScanError};
pub use services::convergence::extract_fenced_block;
pub use services::{ConvergenceLoop, ConvergenceParams};
