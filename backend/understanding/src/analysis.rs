//! Image analysis: one caption, the tag list, and best-effort recognized text.

use std::sync::Arc;

use tracing::{info, warn};

use smartvision_core::{AnalysisResult, Result, VisionService, VisualFeature};

use crate::ocr::{ReadPoller, TextRecognition};

/// Caption used when the service returns none.
pub const NO_CAPTION_FALLBACK: &str = "No caption available";

/// Features requested from the synchronous analysis call.
pub const ANALYSIS_FEATURES: [VisualFeature; 3] = [
    VisualFeature::Description,
    VisualFeature::Tags,
    VisualFeature::Objects,
];

/// Sequences the synchronous analysis with the Read operation and merges both.
pub struct ImageAnalyzer {
    vision: Arc<dyn VisionService>,
    poller: ReadPoller,
    language: String,
}

impl ImageAnalyzer {
    pub fn new(vision: Arc<dyn VisionService>) -> Self {
        Self {
            vision,
            poller: ReadPoller::default(),
            language: "en".to_string(),
        }
    }

    pub fn with_poller(mut self, poller: ReadPoller) -> Self {
        self.poller = poller;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Analyze an image.
    ///
    /// Fails only when the synchronous analysis fails; text recognition
    /// problems degrade to a fallback text.
    pub async fn analyze(&self, image: &[u8]) -> Result<AnalysisResult> {
        let analysis = self.vision.analyze(image, &ANALYSIS_FEATURES).await?;

        let caption = analysis
            .caption
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| NO_CAPTION_FALLBACK.to_string());
        info!(
            provider = self.vision.name(),
            tags = analysis.tags.len(),
            objects = analysis.objects.len(),
            "Image analysis complete"
        );

        let text = self.recognize_text(image).await;
        if let TextRecognition::Fallback(reason) = &text {
            info!(reason = ?reason, "No recognized text for image");
        }

        Ok(AnalysisResult {
            caption,
            tags: analysis.tags,
            text: text.into_text(),
        })
    }

    /// Start a Read operation and wait for it. Never fails.
    pub async fn recognize_text(&self, image: &[u8]) -> TextRecognition {
        let handle = match self.vision.start_read(image, &self.language).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "OCR error (non-critical)");
                return TextRecognition::unavailable(e.to_string());
            }
        };
        self.poller.wait(self.vision.as_ref(), &handle).await.outcome
    }
}
