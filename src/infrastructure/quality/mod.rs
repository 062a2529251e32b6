//! Quality-gate server integration: scanner subprocess, task polling, and
//! findings retrieval.

pub mod client;
pub mod error;

pub use client::{QualityGateClient, QualityGateConfig};
pub use error::ScanError;
