//! Upload orchestration: collision-resistant blob names and delegation to the store.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use smartvision_core::{BlobStore, Result, StoredImageReference, UploadedImage};

use crate::mime_detect::detect_mime_type;

/// Replacement for characters outside `[A-Za-z0-9.]`.
pub const NAME_PLACEHOLDER: char = '-';

/// Replace every character outside `[A-Za-z0-9.]` with the placeholder.
///
/// An empty name becomes `image`.
pub fn sanitize_file_name(original: &str) -> String {
    if original.is_empty() {
        return "image".to_string();
    }
    original
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' {
                c
            } else {
                NAME_PLACEHOLDER
            }
        })
        .collect()
}

/// `<timestamp_ms>-<sanitized name>`.
///
/// Two uploads of the same name within one millisecond collide; accepted.
pub fn blob_name_for(original: &str, timestamp_ms: i64) -> String {
    format!("{}-{}", timestamp_ms, sanitize_file_name(original))
}

/// Stores uploaded images under timestamped names.
pub struct ImageUploader {
    store: Arc<dyn BlobStore>,
}

impl ImageUploader {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Upload the image and return where it was stored. No retries.
    pub async fn upload(&self, image: &UploadedImage) -> Result<StoredImageReference> {
        let blob_name = blob_name_for(&image.file_name, Utc::now().timestamp_millis());
        let content_type = image
            .content_type
            .clone()
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| detect_mime_type(Path::new(&image.file_name)).to_string());

        let url = self
            .store
            .put(&blob_name, image.data.clone(), &content_type)
            .await?;
        info!(
            store = self.store.name(),
            blob = %blob_name,
            content_type = %content_type,
            bytes = image.data.len(),
            "Stored uploaded image"
        );
        Ok(StoredImageReference { blob_name, url })
    }
}
