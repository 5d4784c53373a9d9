pub mod analysis;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod ocr;
pub mod vision;

pub use analysis::{ImageAnalyzer, ANALYSIS_FEATURES, NO_CAPTION_FALLBACK};
#[cfg(any(test, feature = "test-util"))]
pub use mock::ScriptedVision;
pub use ocr::{
    FallbackReason, PollReport, ReadPoller, TextRecognition, NO_TEXT_FALLBACK,
    UNAVAILABLE_FALLBACK,
};
pub use vision::AzureVisionClient;
