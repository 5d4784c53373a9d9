//! Config validation: collects every problem in one pass so the operator can
//! fix the environment without a restart loop.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::settings::Config;

/// Lowercase letters, digits and single hyphens, 3-63 chars.
static CONTAINER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]{1,61}[a-z0-9]$").unwrap());

/// A config validation error with the environment variable it concerns.
#[derive(Debug, Error)]
#[error("{var}: {message}")]
pub struct ConfigValidationError {
    pub var: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// One line per error, suitable for a startup failure message.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn error(&mut self, var: &str, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            var: var.to_string(),
            message: message.into(),
        });
    }

    fn warn(&mut self, var: &str, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            var: var.to_string(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &Config) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_vision(config, &mut report);
    validate_storage(config, &mut report);
    validate_limits(config, &mut report);
    report
}

fn validate_vision(config: &Config, report: &mut ValidationReport) {
    match config.vision_endpoint.as_deref() {
        None => report.error("COMPUTER_VISION_ENDPOINT", "is required"),
        Some(endpoint) if !is_http_url(endpoint) => {
            report.error("COMPUTER_VISION_ENDPOINT", "must be an http(s) URL")
        }
        Some(endpoint) if endpoint.starts_with("http://") => {
            report.warn("COMPUTER_VISION_ENDPOINT", "uses plain http; the key is sent unencrypted")
        }
        Some(_) => {}
    }
    if config.vision_key.is_none() {
        report.error("COMPUTER_VISION_KEY", "is required");
    }
    if config.ocr_language.trim().is_empty() {
        report.error("OCR_LANGUAGE", "cannot be empty");
    }
}

fn validate_storage(config: &Config, report: &mut ValidationReport) {
    match config.blob_connection_string.as_deref() {
        None => report.error("BLOB_CONNECTION_STRING", "is required"),
        Some(conn) if !conn.contains('=') => {
            report.error("BLOB_CONNECTION_STRING", "is not a key=value connection string")
        }
        Some(_) => {}
    }
    match config.blob_container.as_deref() {
        None => report.error("BLOB_CONTAINER_NAME", "is required"),
        Some(name) if !is_valid_container_name(name) => report.error(
            "BLOB_CONTAINER_NAME",
            format!("'{name}' must be 3-63 lowercase letters, digits or single hyphens"),
        ),
        Some(_) => {}
    }
}

fn validate_limits(config: &Config, report: &mut ValidationReport) {
    if config.ocr_max_attempts == 0 {
        report.error("OCR_MAX_ATTEMPTS", "must be at least 1");
    }
    if config.ocr_poll_interval_ms > 60_000 {
        report.warn("OCR_POLL_INTERVAL_MS", "is over a minute; requests will wait a long time for text");
    }
    if config.max_upload_bytes == 0 {
        report.error("MAX_UPLOAD_BYTES", "must be greater than zero");
    }
}

fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.trim_matches('/').is_empty())
}

/// Azure container naming rules.
pub fn is_valid_container_name(name: &str) -> bool {
    CONTAINER_NAME.is_match(name) && !name.contains("--")
}
