//! Azure Blob Storage client (REST).
//!
//! Two operations: create the container if missing, and upload a block blob.
//! Requests are signed with Shared Key when the connection string carries an
//! account key; otherwise the SAS query string is appended.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, Response, StatusCode, Url};
use sha2::Sha256;
use tracing::{debug, info};

use smartvision_core::{BlobStore, Result, SmartVisionError};

use crate::connection_string::{ConnectionString, StorageCredential};

pub const STORAGE_API_VERSION: &str = "2021-08-06";

/// Azure Blob Storage container client.
pub struct AzureBlobStore {
    client: Client,
    connection: ConnectionString,
    container: String,
}

impl AzureBlobStore {
    pub fn new(connection: ConnectionString, container: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            connection,
            container: container.into(),
        }
    }

    pub fn from_connection_string(raw: &str, container: impl Into<String>) -> Result<Self> {
        Ok(Self::new(ConnectionString::parse(raw)?, container))
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn account_name(&self) -> &str {
        &self.connection.account_name
    }

    /// Public URL of a blob in this container (never includes a SAS token).
    pub fn blob_url(&self, blob_name: &str) -> String {
        format!("{}/{}", self.container_url(), blob_name)
    }

    fn container_url(&self) -> String {
        format!("{}/{}", self.connection.blob_endpoint, self.container)
    }

    async fn send(&self, request: StorageRequest<'_>) -> Result<Response> {
        let mut url = Url::parse(request.url)
            .map_err(|e| SmartVisionError::Storage(format!("invalid blob URL {}: {e}", request.url)))?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in request.query {
                pairs.append_pair(name, value);
            }
        }

        let mut ms_headers: Vec<(String, String)> = vec![
            ("x-ms-date".into(), Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()),
            ("x-ms-version".into(), STORAGE_API_VERSION.into()),
        ];
        ms_headers.extend(
            request
                .ms_headers
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string())),
        );

        let authorization = match &self.connection.credential {
            StorageCredential::AccountKey(key) => {
                let to_sign = string_to_sign(&SignParts {
                    method: request.method.as_str(),
                    content_length: request.body.len(),
                    content_type: request.content_type.unwrap_or(""),
                    ms_headers: &ms_headers,
                    account: &self.connection.account_name,
                    path: url.path(),
                    query: request.query,
                });
                Some(format!(
                    "SharedKey {}:{}",
                    self.connection.account_name,
                    sign(key, &to_sign)?
                ))
            }
            StorageCredential::SharedAccessSignature(sas) => {
                let query = match url.query() {
                    Some(existing) if !existing.is_empty() => format!("{existing}&{sas}"),
                    _ => sas.clone(),
                };
                url.set_query(Some(&query));
                None
            }
        };

        let mut builder = self.client.request(request.method.clone(), url);
        for (name, value) in &ms_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(content_type) = request.content_type {
            builder = builder.header(reqwest::header::CONTENT_TYPE, content_type);
        }
        if let Some(authorization) = authorization {
            builder = builder.header(reqwest::header::AUTHORIZATION, authorization);
        }

        builder
            .body(request.body)
            .send()
            .await
            .map_err(|e| SmartVisionError::Storage(e.to_string()))
    }
}

struct StorageRequest<'a> {
    method: Method,
    url: &'a str,
    query: &'a [(&'a str, &'a str)],
    ms_headers: &'a [(&'a str, &'a str)],
    content_type: Option<&'a str>,
    body: Bytes,
}

/// Inputs of the Shared Key string-to-sign.
pub struct SignParts<'a> {
    pub method: &'a str,
    pub content_length: usize,
    pub content_type: &'a str,
    pub ms_headers: &'a [(String, String)],
    pub account: &'a str,
    /// Percent-encoded URL path, starting with `/`.
    pub path: &'a str,
    pub query: &'a [(&'a str, &'a str)],
}

/// Build the Shared Key string-to-sign for a Blob service request.
pub fn string_to_sign(parts: &SignParts<'_>) -> String {
    // Content-Length is empty, not "0", for bodiless requests.
    let length = if parts.content_length == 0 {
        String::new()
    } else {
        parts.content_length.to_string()
    };

    let mut headers: Vec<(String, String)> = parts
        .ms_headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    headers.sort();
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();

    let mut params: Vec<(String, &str)> = parts
        .query
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), *value))
        .collect();
    params.sort();
    let mut canonical_resource = format!("/{}{}", parts.account, parts.path);
    for (name, value) in params {
        canonical_resource.push_str(&format!("\n{name}:{value}"));
    }

    format!(
        "{}\n\n\n{}\n\n{}\n\n\n\n\n\n\n{}{}",
        parts.method, length, parts.content_type, canonical_headers, canonical_resource
    )
}

/// HMAC-SHA256 with the decoded account key, base64 encoded.
fn sign(account_key: &str, to_sign: &str) -> Result<String> {
    let key = STANDARD
        .decode(account_key)
        .map_err(|e| SmartVisionError::Config(format!("storage account key is not base64: {e}")))?;
    let mut mac = Hmac::<Sha256>::new_from_slice(&key)
        .map_err(|e| SmartVisionError::Config(format!("invalid storage account key: {e}")))?;
    mac.update(to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Convert a failed storage response into `StorageApi`.
async fn storage_error(response: Response) -> SmartVisionError {
    let status = response.status();
    let code = response
        .headers()
        .get("x-ms-error-code")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let body = response.text().await.unwrap_or_default();
    let message = xml_element(&body, "Message")
        .map(|m| m.lines().next().unwrap_or("").trim().to_string())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    let code = if code.is_empty() {
        xml_element(&body, "Code").unwrap_or_default()
    } else {
        code
    };
    SmartVisionError::StorageApi {
        status: status.as_u16(),
        code,
        message,
    }
}

/// First `<tag>...</tag>` text in the body.
///
/// Assumes Azure's flat `<Error><Code/><Message/></Error>` document; nested
/// elements with the same tag are not distinguished.
fn xml_element(body: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&close)? + start;
    Some(body[start..end].to_string())
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    fn name(&self) -> &str {
        "azure-blob"
    }

    async fn ensure_container(&self) -> Result<()> {
        let url = self.container_url();
        let response = self
            .send(StorageRequest {
                method: Method::PUT,
                url: &url,
                query: &[("restype", "container")],
                ms_headers: &[("x-ms-blob-public-access", "blob")],
                content_type: None,
                body: Bytes::new(),
            })
            .await?;

        match response.status() {
            StatusCode::CREATED => {
                info!(container = %self.container, "Created blob container");
                Ok(())
            }
            StatusCode::CONFLICT => {
                debug!(container = %self.container, "Blob container already exists");
                Ok(())
            }
            _ => Err(storage_error(response).await),
        }
    }

    async fn put(&self, blob_name: &str, data: Bytes, content_type: &str) -> Result<String> {
        let url = self.blob_url(blob_name);
        let size = data.len();
        let response = self
            .send(StorageRequest {
                method: Method::PUT,
                url: &url,
                query: &[],
                ms_headers: &[("x-ms-blob-type", "BlockBlob")],
                content_type: Some(content_type),
                body: data,
            })
            .await?;

        if !response.status().is_success() {
            return Err(storage_error(response).await);
        }
        debug!(blob = %blob_name, bytes = size, "Uploaded blob");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn string_to_sign_for_blob_upload() {
        let ms = headers(&[
            ("x-ms-version", "2021-08-06"),
            ("x-ms-date", "Mon, 01 Jan 2024 00:00:00 GMT"),
            ("x-ms-blob-type", "BlockBlob"),
        ]);
        let s = string_to_sign(&SignParts {
            method: "PUT",
            content_length: 3,
            content_type: "image/png",
            ms_headers: &ms,
            account: "acct",
            path: "/images/a.png",
            query: &[],
        });
        assert_eq!(
            s,
            "PUT\n\n\n3\n\nimage/png\n\n\n\n\n\n\n\
             x-ms-blob-type:BlockBlob\n\
             x-ms-date:Mon, 01 Jan 2024 00:00:00 GMT\n\
             x-ms-version:2021-08-06\n\
             /acct/images/a.png"
        );
    }

    #[test]
    fn string_to_sign_for_container_create() {
        let ms = headers(&[
            ("x-ms-date", "Mon, 01 Jan 2024 00:00:00 GMT"),
            ("x-ms-version", "2021-08-06"),
            ("x-ms-blob-public-access", "blob"),
        ]);
        let s = string_to_sign(&SignParts {
            method: "PUT",
            content_length: 0,
            content_type: "",
            ms_headers: &ms,
            account: "acct",
            path: "/images",
            query: &[("restype", "container")],
        });
        assert_eq!(
            s,
            format!(
                "PUT{}x-ms-blob-public-access:blob\nx-ms-date:Mon, 01 Jan 2024 00:00:00 GMT\nx-ms-version:2021-08-06\n/acct/images\nrestype:container",
                "\n".repeat(12)
            )
        );
    }

    #[test]
    fn signature_is_base64_sha256() {
        let sig = sign("a2V5", "PUT\n").unwrap();
        assert_eq!(STANDARD.decode(&sig).unwrap().len(), 32);
        assert!(matches!(sign("not base64!", "x"), Err(SmartVisionError::Config(_))));
    }

    fn sas_store(server: &MockServer) -> AzureBlobStore {
        let conn = format!(
            "BlobEndpoint={}/photos;SharedAccessSignature=sv=2022-11-02&sig=secret",
            server.uri()
        );
        AzureBlobStore::from_connection_string(&conn, "images").unwrap()
    }

    #[tokio::test]
    async fn put_uploads_block_blob_with_sas() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/photos/images/1700000000000-cat.png"))
            .and(query_param("sig", "secret"))
            .and(header("x-ms-blob-type", "BlockBlob"))
            .and(header("content-type", "image/png"))
            .and(header("x-ms-version", STORAGE_API_VERSION))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let store = sas_store(&server);
        let url = store
            .put("1700000000000-cat.png", Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();
        assert_eq!(url, format!("{}/photos/images/1700000000000-cat.png", server.uri()));
        assert!(!url.contains("sig="));
    }

    #[tokio::test]
    async fn ensure_container_accepts_existing_container() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/photos/images"))
            .and(query_param("restype", "container"))
            .and(header("x-ms-blob-public-access", "blob"))
            .respond_with(
                ResponseTemplate::new(409).insert_header("x-ms-error-code", "ContainerAlreadyExists"),
            )
            .mount(&server)
            .await;

        sas_store(&server).ensure_container().await.unwrap();
    }

    #[tokio::test]
    async fn shared_key_requests_are_signed() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/devstoreaccount1/images"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let conn = ConnectionString::parse(&format!(
            "UseDevelopmentStorage=true;DevelopmentStorageProxyUri={}",
            server.uri()
        ))
        .unwrap();
        AzureBlobStore::new(conn, "images").ensure_container().await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let auth = requests[0].headers.get("authorization").unwrap().to_str().unwrap();
        assert!(auth.starts_with("SharedKey devstoreaccount1:"), "{auth}");
    }

    #[tokio::test]
    async fn storage_errors_carry_code_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/photos/images/x.png"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-ms-error-code", "AuthenticationFailed")
                    .set_body_string(
                        "<?xml version=\"1.0\" encoding=\"utf-8\"?><Error><Code>AuthenticationFailed</Code><Message>Server failed to authenticate the request.\nRequestId:1</Message></Error>",
                    ),
            )
            .mount(&server)
            .await;

        let err = sas_store(&server)
            .put("x.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap_err();
        match err {
            SmartVisionError::StorageApi { status, code, message } => {
                assert_eq!(status, 403);
                assert_eq!(code, "AuthenticationFailed");
                assert_eq!(message, "Server failed to authenticate the request.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn xml_element_reads_flat_error_document() {
        let body = "<Error><Code>ContainerNotFound</Code><Message>The specified container does not exist.</Message></Error>";
        assert_eq!(xml_element(body, "Code").as_deref(), Some("ContainerNotFound"));
        assert_eq!(
            xml_element(body, "Message").as_deref(),
            Some("The specified container does not exist.")
        );
        assert_eq!(xml_element(body, "AuthenticationErrorDetail"), None);
        assert_eq!(xml_element("<Message>unterminated", "Message"), None);
    }
}
