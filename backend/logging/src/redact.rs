//! Log Redaction Layer
//!
//! Scrubs storage account keys, SAS signatures and subscription keys from
//! strings prior to logging. Remote error bodies sometimes echo request data.

use once_cell::sync::Lazy;
use regex::Regex;

static ACCOUNT_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(AccountKey=)[^;\s]+").unwrap());
static SAS_SIG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)([?&;]sig=)[^&;\s]+").unwrap());
static SUBSCRIPTION_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(Ocp-Apim-Subscription-Key[:=]\s*)\S+").unwrap());
static SHARED_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(SharedKey\s+[^:\s]+:)\S+").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let mut redacted = ACCOUNT_KEY_RE.replace_all(input, "${1}[REDACTED]").to_string();
    redacted = SAS_SIG_RE.replace_all(&redacted, "${1}[REDACTED]").to_string();
    redacted = SUBSCRIPTION_KEY_RE
        .replace_all(&redacted, "${1}[REDACTED]")
        .to_string();
    redacted = SHARED_KEY_RE.replace_all(&redacted, "${1}[REDACTED]").to_string();
    redacted
}
