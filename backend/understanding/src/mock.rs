use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use smartvision_core::{
    ImageAnalysis, OperationHandle, ReadResult, ReadStatus, Result, SmartVisionError,
    VisionService, VisualFeature,
};

/// A vision service that replays canned responses and counts calls.
///
/// Read results are consumed in order; the last entry repeats once the
/// script runs out. Errors are given as messages.
pub struct ScriptedVision {
    analysis: std::result::Result<ImageAnalysis, String>,
    start: std::result::Result<OperationHandle, String>,
    read_script: Mutex<Vec<std::result::Result<ReadResult, String>>>,
    analyze_calls: AtomicUsize,
    start_calls: AtomicUsize,
    read_queries: AtomicUsize,
}

impl Default for ScriptedVision {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedVision {
    pub fn new() -> Self {
        Self {
            analysis: Ok(ImageAnalysis::default()),
            start: Ok(OperationHandle::new("mock-operation")),
            read_script: Mutex::new(vec![Ok(ReadResult::succeeded(Vec::<String>::new()))]),
            analyze_calls: AtomicUsize::new(0),
            start_calls: AtomicUsize::new(0),
            read_queries: AtomicUsize::new(0),
        }
    }

    pub fn with_analysis(mut self, analysis: ImageAnalysis) -> Self {
        self.analysis = Ok(analysis);
        self
    }

    pub fn with_analysis_error(mut self, message: impl Into<String>) -> Self {
        self.analysis = Err(message.into());
        self
    }

    pub fn with_start_error(mut self, message: impl Into<String>) -> Self {
        self.start = Err(message.into());
        self
    }

    pub fn with_read_script(self, script: Vec<std::result::Result<ReadResult, String>>) -> Self {
        *self.read_script.lock().unwrap() = script;
        self
    }

    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn read_queries(&self) -> usize {
        self.read_queries.load(Ordering::SeqCst)
    }

    /// Total remote calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.analyze_calls() + self.start_calls() + self.read_queries()
    }
}

#[async_trait]
impl VisionService for ScriptedVision {
    fn name(&self) -> &str {
        "mock"
    }

    async fn analyze(&self, _image: &[u8], _features: &[VisualFeature]) -> Result<ImageAnalysis> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        self.analysis.clone().map_err(SmartVisionError::Vision)
    }

    async fn start_read(&self, _image: &[u8], _language: &str) -> Result<OperationHandle> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.start.clone().map_err(SmartVisionError::Vision)
    }

    async fn read_result(&self, _handle: &OperationHandle) -> Result<ReadResult> {
        self.read_queries.fetch_add(1, Ordering::SeqCst);
        let mut script = self.read_script.lock().unwrap();
        let next = if script.len() > 1 {
            script.remove(0)
        } else {
            script
                .first()
                .cloned()
                .unwrap_or_else(|| Ok(ReadResult::with_status(ReadStatus::Running)))
        };
        next.map_err(SmartVisionError::Vision)
    }
}
