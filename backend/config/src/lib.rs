//! `smartvision-config` - environment configuration for the SmartVision server.
//!
//! Provides:
//! - Typed settings loaded from the environment (and an optional `.env` file)
//! - Validation that reports every problem in one pass
//! - Redaction for safe logging/display

pub mod redact;
pub mod settings;
pub mod validation;

pub use redact::{redact, redacted_summary};
pub use settings::{Config, LogFormat};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Result};

/// Validate a loaded config and fail if it is unusable.
///
/// Warnings are logged; errors are returned as one combined message.
pub fn ensure_valid(config: &Config) -> Result<()> {
    let report = validate(config);
    for warning in &report.warnings {
        tracing::warn!(var = %warning.var, message = %warning.message, "Config warning");
    }
    if !report.is_valid() {
        for error in &report.errors {
            tracing::error!(var = %error.var, message = %error.message, "Config error");
        }
        bail!("invalid configuration: {}", report.summary());
    }
    Ok(())
}
