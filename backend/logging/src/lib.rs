//! Structured logging for SmartVision.
//!
//! Handles subscriber setup (console plus optional rotated NDJSON files) and
//! redaction of credentials before they reach a log line.

pub mod logger;
pub mod redact;

pub use logger::{init_logger, LogSettings};
pub use redact::redact_sensitive_data;
