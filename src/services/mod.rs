//! Service layer: council fan-out, the convergence loop, and response
//! analysis.

pub mod analysis;
pub mod council;
pub mod convergence;

pub use convergence::{ConvergenceLoop, ConvergenceParams};
