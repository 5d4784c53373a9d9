pub mod error;
pub mod traits;
pub mod types;

pub use error::{Result, SmartVisionError};
pub use traits::{BlobStore, VisionService};
pub use types::{
    AnalysisResult, ImageAnalysis, OperationHandle, ReadResult, ReadStatus, StoredImageReference,
    UploadedImage, VisualFeature,
};
