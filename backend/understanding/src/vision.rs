//! Azure Computer Vision client (REST v3.2).
//!
//! Covers the three calls the service needs: synchronous analysis, starting a
//! Read (OCR) operation, and querying that operation.

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::Deserialize;
use tracing::debug;

use smartvision_core::{
    ImageAnalysis, OperationHandle, ReadResult, ReadStatus, Result, SmartVisionError,
    VisionService, VisualFeature,
};

const API_PATH: &str = "vision/v3.2";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Azure Computer Vision provider.
pub struct AzureVisionClient {
    client: Client,
    endpoint: String,
    key: String,
}

impl AzureVisionClient {
    pub fn new(endpoint: impl Into<String>, key: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            endpoint,
            key: key.into(),
        }
    }

    /// Reuse an existing HTTP client (connection pool, timeouts).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.endpoint, API_PATH, path)
    }

    async fn post_image(&self, url: &str, query: &[(&str, String)], image: &[u8]) -> Result<Response> {
        let response = self
            .client
            .post(url)
            .query(query)
            .header(SUBSCRIPTION_KEY_HEADER, &self.key)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| SmartVisionError::Vision(e.to_string()))?;
        ensure_success(response).await
    }
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    description: Option<Description>,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    objects: Vec<DetectedObject>,
}

#[derive(Deserialize)]
struct Description {
    #[serde(default)]
    captions: Vec<Caption>,
}

#[derive(Deserialize)]
struct Caption {
    text: String,
}

#[derive(Deserialize)]
struct Tag {
    name: String,
}

#[derive(Deserialize)]
struct DetectedObject {
    object: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadOperation {
    status: ReadStatus,
    #[serde(default)]
    analyze_result: Option<ReadAnalyzeResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadAnalyzeResult {
    #[serde(default)]
    read_results: Vec<ReadPage>,
}

#[derive(Deserialize)]
struct ReadPage {
    #[serde(default)]
    lines: Vec<ReadLine>,
}

#[derive(Deserialize)]
struct ReadLine {
    text: String,
}

impl From<AnalyzeResponse> for ImageAnalysis {
    fn from(response: AnalyzeResponse) -> Self {
        let caption = response
            .description
            .and_then(|d| d.captions.into_iter().next())
            .map(|c| c.text);
        Self {
            caption,
            tags: response.tags.into_iter().map(|t| t.name).collect(),
            objects: response.objects.into_iter().map(|o| o.object).collect(),
        }
    }
}

impl From<ReadOperation> for ReadResult {
    fn from(operation: ReadOperation) -> Self {
        // Only the first page is used; single images have exactly one.
        let lines = operation
            .analyze_result
            .and_then(|r| r.read_results.into_iter().next())
            .map(|page| page.lines.into_iter().map(|l| l.text).collect())
            .unwrap_or_default();
        Self {
            status: operation.status,
            lines,
        }
    }
}

/// Turn a non-2xx response into `VisionApi`, preferring the service's own message.
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SmartVisionError::VisionApi {
        status: status.as_u16(),
        message: error_message(&body).unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            }
        }),
    })
}

/// Azure returns either `{"error": {"code", "message"}}` or a flat `{"code", "message"}`.
fn error_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    json["error"]["message"]
        .as_str()
        .or_else(|| json["message"].as_str())
        .map(str::to_string)
}

#[async_trait]
impl VisionService for AzureVisionClient {
    fn name(&self) -> &str {
        "azure"
    }

    async fn analyze(&self, image: &[u8], features: &[VisualFeature]) -> Result<ImageAnalysis> {
        let features = features
            .iter()
            .map(VisualFeature::as_str)
            .collect::<Vec<_>>()
            .join(",");
        debug!(features = %features, bytes = image.len(), "Requesting image analysis");

        let response = self
            .post_image(&self.url("analyze"), &[("visualFeatures", features)], image)
            .await?;
        let parsed: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| SmartVisionError::Vision(format!("malformed analysis response: {e}")))?;
        Ok(parsed.into())
    }

    async fn start_read(&self, image: &[u8], language: &str) -> Result<OperationHandle> {
        let response = self
            .post_image(&self.url("read/analyze"), &[("language", language.to_string())], image)
            .await?;
        let location = response
            .headers()
            .get("operation-location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                SmartVisionError::Vision("Read response is missing Operation-Location".into())
            })?;
        let handle = OperationHandle::from_operation_location(location).ok_or_else(|| {
            SmartVisionError::Vision(format!("unrecognized Operation-Location: {location}"))
        })?;
        debug!(operation = %handle, "Started Read operation");
        Ok(handle)
    }

    async fn read_result(&self, handle: &OperationHandle) -> Result<ReadResult> {
        let url = self.url(&format!("read/analyzeResults/{}", handle.as_str()));
        let response = self
            .client
            .get(url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.key)
            .send()
            .await
            .map_err(|e| SmartVisionError::Vision(e.to_string()))?;
        let response = ensure_success(response).await?;
        let operation: ReadOperation = response
            .json()
            .await
            .map_err(|e| SmartVisionError::Vision(format!("malformed Read response: {e}")))?;
        Ok(operation.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_bytes, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "test-key";

    async fn client(server: &MockServer) -> AzureVisionClient {
        AzureVisionClient::new(format!("{}/", server.uri()), KEY)
    }

    #[tokio::test]
    async fn analyze_maps_caption_tags_and_objects() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vision/v3.2/analyze"))
            .and(query_param("visualFeatures", "Description,Tags,Objects"))
            .and(header(SUBSCRIPTION_KEY_HEADER, KEY))
            .and(header("content-type", "application/octet-stream"))
            .and(body_bytes(vec![1u8, 2, 3]))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "description": { "captions": [
                    { "text": "a dog on a beach", "confidence": 0.91 },
                    { "text": "a dog", "confidence": 0.5 }
                ]},
                "tags": [
                    { "name": "dog", "confidence": 0.99 },
                    { "name": "beach", "confidence": 0.95 },
                    { "name": "outdoor", "confidence": 0.9 }
                ],
                "objects": [ { "object": "dog", "confidence": 0.8 } ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let features = [VisualFeature::Description, VisualFeature::Tags, VisualFeature::Objects];
        let analysis = client(&server).await.analyze(&[1, 2, 3], &features).await.unwrap();
        assert_eq!(analysis.caption.as_deref(), Some("a dog on a beach"));
        assert_eq!(analysis.tags, vec!["dog", "beach", "outdoor"]);
        assert_eq!(analysis.objects, vec!["dog"]);
    }

    #[tokio::test]
    async fn analyze_tolerates_missing_sections() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vision/v3.2/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "requestId": "r1" })))
            .mount(&server)
            .await;

        let analysis = client(&server)
            .await
            .analyze(&[0], &[VisualFeature::Description])
            .await
            .unwrap();
        assert_eq!(analysis, ImageAnalysis::default());
    }

    #[tokio::test]
    async fn analyze_surfaces_service_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vision/v3.2/analyze"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": "InvalidImageFormat", "message": "Input data is not a valid image." }
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .analyze(&[0], &[VisualFeature::Tags])
            .await
            .unwrap_err();
        match err {
            SmartVisionError::VisionApi { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Input data is not a valid image.");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn start_read_returns_operation_id() {
        let server = MockServer::start().await;
        let location = format!("{}/vision/v3.2/read/analyzeResults/op-123", server.uri());
        Mock::given(method("POST"))
            .and(path("/vision/v3.2/read/analyze"))
            .and(query_param("language", "en"))
            .respond_with(ResponseTemplate::new(202).insert_header("Operation-Location", location.as_str()))
            .mount(&server)
            .await;

        let handle = client(&server).await.start_read(&[9], "en").await.unwrap();
        assert_eq!(handle.as_str(), "op-123");
    }

    #[tokio::test]
    async fn start_read_without_location_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vision/v3.2/read/analyze"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let err = client(&server).await.start_read(&[9], "en").await.unwrap_err();
        assert!(err.to_string().contains("Operation-Location"));
    }

    #[tokio::test]
    async fn read_result_uses_first_page_lines() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vision/v3.2/read/analyzeResults/op-123"))
            .and(header(SUBSCRIPTION_KEY_HEADER, KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "succeeded",
                "analyzeResult": { "readResults": [
                    { "page": 1, "lines": [ { "text": "HELLO" }, { "text": "WORLD" } ] },
                    { "page": 2, "lines": [ { "text": "ignored" } ] }
                ]}
            })))
            .mount(&server)
            .await;

        let result = client(&server)
            .await
            .read_result(&OperationHandle::new("op-123"))
            .await
            .unwrap();
        assert_eq!(result.status, ReadStatus::Succeeded);
        assert_eq!(result.lines, vec!["HELLO", "WORLD"]);
    }

    #[tokio::test]
    async fn read_result_while_running_has_no_lines() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vision/v3.2/read/analyzeResults/op-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "running" })))
            .mount(&server)
            .await;

        let result = client(&server)
            .await
            .read_result(&OperationHandle::new("op-9"))
            .await
            .unwrap();
        assert_eq!(result, ReadResult::with_status(ReadStatus::Running));
    }

    #[test]
    fn error_message_handles_both_shapes() {
        assert_eq!(
            error_message(r#"{"error":{"code":"X","message":"nested"}}"#).as_deref(),
            Some("nested")
        );
        assert_eq!(error_message(r#"{"code":"X","message":"flat"}"#).as_deref(), Some("flat"));
        assert_eq!(error_message("not json"), None);
    }
}
