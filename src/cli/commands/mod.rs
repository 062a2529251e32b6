//! Subcommand implementations.

pub mod ask;
pub mod converge;
pub mod scan;
