//! Config redaction: produce safe-to-log config snapshots by masking secrets.

use serde_json::Value;

use crate::settings::Config;

/// Field names whose values are secrets.
static SECRET_KEYS: &[&str] = &["visionKey", "blobConnectionString"];

/// Serialize the config with every secret masked.
pub fn redacted_summary(config: &Config) -> Value {
    let value = serde_json::to_value(config).unwrap_or(Value::Null);
    redact(&value)
}

/// Redact a config JSON value, replacing sensitive fields with a short hint.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn is_sensitive_key(key: &str) -> bool {
    SECRET_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn redact_string(s: &str, key: &str) -> Value {
    if is_sensitive_key(key) && !s.is_empty() {
        let hint: String = s.chars().take(4).collect();
        return Value::String(format!("{hint}***"));
    }
    Value::String(s.to_string())
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) => redact_string(s, key),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                result.insert(k.clone(), redact_recursive(v, k));
            }
            Value::Object(result)
        }
        other => other.clone(),
    }
}
