use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use smartvision_core::{BlobStore, Result, SmartVisionError};

/// A blob held by [`InMemoryBlobStore`].
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub data: Bytes,
    pub content_type: String,
}

/// A blob store that keeps everything in memory, for tests.
pub struct InMemoryBlobStore {
    base_url: String,
    blobs: Mutex<HashMap<String, StoredBlob>>,
    fail_with: Option<String>,
}

impl InMemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            blobs: Mutex::new(HashMap::new()),
            fail_with: None,
        }
    }

    /// Make every operation fail with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    pub fn get(&self, blob_name: &str) -> Option<StoredBlob> {
        self.blobs.lock().ok()?.get(blob_name).cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<()> {
        match &self.fail_with {
            Some(message) => Err(SmartVisionError::Storage(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn ensure_container(&self) -> Result<()> {
        self.check()
    }

    async fn put(&self, blob_name: &str, data: Bytes, content_type: &str) -> Result<String> {
        self.check()?;
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| SmartVisionError::Storage("in-memory store lock poisoned".into()))?;
        blobs.insert(
            blob_name.to_string(),
            StoredBlob {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("{}/{}", self.base_url, blob_name))
    }
}
