use thiserror::Error;

/// Top-level error type for the SmartVision service.
#[derive(Debug, Error)]
pub enum SmartVisionError {
    #[error("vision request failed: {0}")]
    Vision(String),

    #[error("vision service returned {status}: {message}")]
    VisionApi { status: u16, message: String },

    #[error("storage request failed: {0}")]
    Storage(String),

    #[error("storage service returned {status} ({code}): {message}")]
    StorageApi {
        status: u16,
        code: String,
        message: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SmartVisionError>;
