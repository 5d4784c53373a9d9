pub mod blob;
pub mod connection_string;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod mime_detect;
pub mod upload;

pub use blob::{AzureBlobStore, STORAGE_API_VERSION};
pub use connection_string::{ConnectionString, StorageCredential};
#[cfg(any(test, feature = "test-util"))]
pub use memory::{InMemoryBlobStore, StoredBlob};
pub use mime_detect::{detect_mime_type, is_image};
pub use upload::{blob_name_for, sanitize_file_name, ImageUploader, NAME_PLACEHOLDER};
