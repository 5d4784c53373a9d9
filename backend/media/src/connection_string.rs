//! Azure Storage connection strings.
//!
//! Accepts account-key strings, SAS strings, explicit `BlobEndpoint` strings
//! and the Azurite shortcut `UseDevelopmentStorage=true`.

use std::collections::HashMap;

use smartvision_core::{Result, SmartVisionError};

const DEV_ACCOUNT: &str = "devstoreaccount1";
const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

/// How requests to the account are authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCredential {
    /// Base64 account key used for Shared Key signing.
    AccountKey(String),
    /// SAS query string without the leading `?`.
    SharedAccessSignature(String),
}

/// A parsed connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub account_name: String,
    /// Blob service endpoint without a trailing slash.
    pub blob_endpoint: String,
    pub credential: StorageCredential,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self> {
        let pairs = parse_pairs(raw);

        if pairs
            .get("UseDevelopmentStorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            let endpoint = pairs
                .get("DevelopmentStorageProxyUri")
                .map(|proxy| format!("{}/{}", proxy.trim_end_matches('/'), DEV_ACCOUNT))
                .unwrap_or_else(|| DEV_BLOB_ENDPOINT.to_string());
            return Ok(Self {
                account_name: DEV_ACCOUNT.to_string(),
                blob_endpoint: endpoint,
                credential: StorageCredential::AccountKey(DEV_ACCOUNT_KEY.to_string()),
            });
        }

        let credential = if let Some(key) = pairs.get("AccountKey") {
            StorageCredential::AccountKey(key.clone())
        } else if let Some(sas) = pairs.get("SharedAccessSignature") {
            StorageCredential::SharedAccessSignature(sas.trim_start_matches('?').to_string())
        } else {
            return Err(config_error("needs AccountKey or SharedAccessSignature"));
        };

        let account_name = pairs.get("AccountName").cloned();
        let blob_endpoint = match pairs.get("BlobEndpoint") {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => {
                let account = account_name
                    .as_deref()
                    .ok_or_else(|| config_error("needs AccountName or BlobEndpoint"))?;
                let protocol = pairs
                    .get("DefaultEndpointsProtocol")
                    .map(String::as_str)
                    .unwrap_or("https");
                let suffix = pairs
                    .get("EndpointSuffix")
                    .map(String::as_str)
                    .unwrap_or("core.windows.net");
                format!("{protocol}://{account}.blob.{suffix}")
            }
        };

        let account_name = match account_name {
            Some(name) => name,
            None => account_from_endpoint(&blob_endpoint)
                .ok_or_else(|| config_error("needs AccountName"))?,
        };

        if matches!(credential, StorageCredential::AccountKey(_)) && account_name.is_empty() {
            return Err(config_error("AccountName cannot be empty"));
        }

        Ok(Self {
            account_name,
            blob_endpoint,
            credential,
        })
    }
}

fn parse_pairs(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter_map(|part| {
            let part = part.trim();
            // Values (keys, SAS strings) may contain '=' themselves.
            let (key, value) = part.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// `https://acct.blob.core.windows.net` → `acct`.
fn account_from_endpoint(endpoint: &str) -> Option<String> {
    let host = endpoint.split("://").nth(1)?.split(['/', ':']).next()?;
    host.split('.').next().filter(|s| !s.is_empty()).map(str::to_string)
}

fn config_error(message: &str) -> SmartVisionError {
    SmartVisionError::Config(format!("storage connection string {message}"))
}
