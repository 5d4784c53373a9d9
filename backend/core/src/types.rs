use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// An image received from a client, held only for the duration of one request.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub data: Bytes,
    pub file_name: String,
    /// Content type declared by the client, if any.
    pub content_type: Option<String>,
}

impl UploadedImage {
    pub fn new(data: impl Into<Bytes>, file_name: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            file_name: file_name.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Combined caption, tags and recognized text for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub caption: String,
    pub tags: Vec<String>,
    pub text: String,
}

/// Where an uploaded image was durably stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImageReference {
    pub blob_name: String,
    pub url: String,
}

/// Opaque id of an in-progress Read (OCR) operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationHandle(String);

impl OperationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Extract the operation id from an `Operation-Location` URL.
    ///
    /// The id is the last non-empty path segment; query strings are ignored.
    pub fn from_operation_location(location: &str) -> Option<Self> {
        let path = location.split(['?', '#']).next().unwrap_or("");
        path.rsplit('/')
            .find(|segment| !segment.is_empty())
            .filter(|segment| !segment.contains(':'))
            .map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Features requested from the synchronous analysis call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualFeature {
    Description,
    Tags,
    Objects,
}

impl VisualFeature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Description => "Description",
            Self::Tags => "Tags",
            Self::Objects => "Objects",
        }
    }
}

/// Result of a synchronous image analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageAnalysis {
    /// First caption returned by the service, if any.
    pub caption: Option<String>,
    /// Tag names in service order.
    pub tags: Vec<String>,
    /// Detected object labels.
    pub objects: Vec<String>,
}

/// Status of an asynchronous Read operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl ReadStatus {
    /// Whether the operation has not reached a terminal state yet.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::NotStarted | Self::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "notStarted",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ReadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status query of a Read operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResult {
    pub status: ReadStatus,
    /// Recognized lines of the first page, in service order.
    pub lines: Vec<String>,
}

impl ReadResult {
    pub fn with_status(status: ReadStatus) -> Self {
        Self { status, lines: Vec::new() }
    }

    pub fn succeeded<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            status: ReadStatus::Succeeded,
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}
