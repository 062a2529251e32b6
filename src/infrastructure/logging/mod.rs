//! Logging helpers, chiefly secret redaction for error strings.

pub mod redaction;

pub use redaction::{redact_secrets, SecretRedactor};
