//! Domain layer: pure data types with no I/O.

pub mod models;
