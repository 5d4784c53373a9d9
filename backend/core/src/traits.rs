use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::types::{ImageAnalysis, OperationHandle, ReadResult, VisualFeature};

/// Remote image analysis: captions, tags, objects, and asynchronous text recognition.
///
/// Implementations are built once at startup and shared across requests.
#[async_trait]
pub trait VisionService: Send + Sync {
    /// Provider name used in logs (e.g., "azure").
    fn name(&self) -> &str;

    /// Run a synchronous analysis with the given features.
    async fn analyze(&self, image: &[u8], features: &[VisualFeature]) -> Result<ImageAnalysis>;

    /// Start an asynchronous Read operation and return its handle.
    async fn start_read(&self, image: &[u8], language: &str) -> Result<OperationHandle>;

    /// Query the current state of a Read operation.
    async fn read_result(&self, handle: &OperationHandle) -> Result<ReadResult>;
}

/// Durable object storage addressed by name.
#[async_trait]
pub trait BlobStore: Send + Sync {
    fn name(&self) -> &str;

    /// Create the backing container if it does not exist yet.
    async fn ensure_container(&self) -> Result<()>;

    /// Store `data` under `blob_name` and return its retrieval URL.
    async fn put(&self, blob_name: &str, data: Bytes, content_type: &str) -> Result<String>;
}
