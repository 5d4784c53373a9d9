use std::collections::HashMap;

use serde::Serialize;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_STATIC_DIR: &str = "public";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_OCR_LANGUAGE: &str = "en";
pub const DEFAULT_OCR_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_OCR_POLL_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Console log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// SmartVision runtime configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// Computer Vision endpoint, e.g. `https://<name>.cognitiveservices.azure.com/`
    pub vision_endpoint: Option<String>,
    pub vision_key: Option<String>,
    /// Azure Storage connection string
    pub blob_connection_string: Option<String>,
    pub blob_container: Option<String>,
    /// Directory served for `GET /` and other static paths
    pub static_dir: String,
    /// Request body limit for uploads
    pub max_upload_bytes: usize,
    pub ocr_language: String,
    pub ocr_max_attempts: u32,
    pub ocr_poll_interval_ms: u64,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Directory for rotated NDJSON log files; console only when unset
    pub log_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            vision_endpoint: None,
            vision_key: None,
            blob_connection_string: None,
            blob_container: None,
            static_dir: DEFAULT_STATIC_DIR.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            ocr_language: DEFAULT_OCR_LANGUAGE.to_string(),
            ocr_max_attempts: DEFAULT_OCR_MAX_ATTEMPTS,
            ocr_poll_interval_ms: DEFAULT_OCR_POLL_INTERVAL_MS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::default(),
            log_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is read first; variables already
    /// set in the environment take precedence over it.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from a key/value map (useful for testing).
    pub fn from_map(vars: &HashMap<String, String>) -> Self {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            bind_address: non_empty("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            port: non_empty("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            vision_endpoint: non_empty("COMPUTER_VISION_ENDPOINT"),
            vision_key: non_empty("COMPUTER_VISION_KEY"),
            blob_connection_string: non_empty("BLOB_CONNECTION_STRING"),
            blob_container: non_empty("BLOB_CONTAINER_NAME"),
            static_dir: non_empty("STATIC_DIR").unwrap_or(defaults.static_dir),
            max_upload_bytes: non_empty("MAX_UPLOAD_BYTES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
            ocr_language: non_empty("OCR_LANGUAGE").unwrap_or(defaults.ocr_language),
            ocr_max_attempts: non_empty("OCR_MAX_ATTEMPTS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.ocr_max_attempts),
            ocr_poll_interval_ms: non_empty("OCR_POLL_INTERVAL_MS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.ocr_poll_interval_ms),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: non_empty("LOG_FORMAT")
                .and_then(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
            log_dir: non_empty("LOG_DIR"),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_map(&HashMap::new());
        assert_eq!(config.port, 3000);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.ocr_max_attempts, 10);
        assert_eq!(config.ocr_poll_interval_ms, 1_000);
        assert_eq!(config.ocr_language, "en");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.vision_endpoint.is_none());
    }

    #[test]
    fn reads_service_settings() {
        let config = Config::from_map(&vars(&[
            ("PORT", "8080"),
            ("COMPUTER_VISION_ENDPOINT", "https://cv.example.com/"),
            ("COMPUTER_VISION_KEY", "abc"),
            ("BLOB_CONTAINER_NAME", "images"),
            ("LOG_FORMAT", "JSON"),
        ]));
        assert_eq!(config.port, 8080);
        assert_eq!(config.vision_endpoint.as_deref(), Some("https://cv.example.com/"));
        assert_eq!(config.blob_container.as_deref(), Some("images"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn unparsable_and_blank_values_fall_back() {
        let config = Config::from_map(&vars(&[
            ("PORT", "eighty"),
            ("COMPUTER_VISION_KEY", "   "),
            ("OCR_MAX_ATTEMPTS", "-1"),
        ]));
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.vision_key.is_none());
        assert_eq!(config.ocr_max_attempts, DEFAULT_OCR_MAX_ATTEMPTS);
    }
}
