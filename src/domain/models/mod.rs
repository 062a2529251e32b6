//! Domain models for the council and the convergence loop.

pub mod completion;
pub mod config;
pub mod fixloop;
pub mod report;

pub use completion::{Completion, Role, Turn};
pub use config::{Config, ConvergenceSettings, EndpointSettings, EndpointsConfig, QualityConfig};
pub use fixloop::{LanguageProfile, LinterOutcome, LoopIteration, LoopResult};
pub use report::{Finding, ScanReport, Severity, TaskStatus};
