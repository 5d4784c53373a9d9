//! Optical Character Recognition (OCR)
//!
//! The Read API is asynchronous: starting it returns an operation handle that
//! must be polled. `ReadPoller` turns that into a bounded wait whose outcome is
//! always a value, never an error. Text is best-effort relative to captions.

use std::time::Duration;

use tracing::{debug, info, warn};

use smartvision_core::{OperationHandle, ReadStatus, VisionService};

/// Text returned when recognition finished without usable lines.
pub const NO_TEXT_FALLBACK: &str = "No text detected";
/// Text returned when the Read calls themselves errored.
pub const UNAVAILABLE_FALLBACK: &str = "Text detection unavailable";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Why no recognized text is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The operation succeeded but produced no lines.
    NoText,
    /// The service reported a terminal status other than `succeeded`.
    Failed { status: ReadStatus },
    /// Still pending after the whole attempt budget.
    Exhausted { attempts: u32 },
    /// A Read call returned an error.
    Unavailable { reason: String },
}

/// Outcome of text recognition for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextRecognition {
    Recognized(String),
    Fallback(FallbackReason),
}

impl TextRecognition {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Fallback(FallbackReason::Unavailable {
            reason: reason.into(),
        })
    }

    pub fn is_recognized(&self) -> bool {
        matches!(self, Self::Recognized(_))
    }

    /// The text to show a client: recognized lines or a fixed fallback string.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Recognized(text) => text,
            Self::Fallback(FallbackReason::Unavailable { .. }) => UNAVAILABLE_FALLBACK,
            Self::Fallback(_) => NO_TEXT_FALLBACK,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Recognized(text) => text,
            other => other.as_text().to_string(),
        }
    }
}

/// Result of one bounded wait, with the number of status queries made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub outcome: TextRecognition,
    pub attempts: u32,
}

/// Bounded fixed-delay poller for Read operations.
#[derive(Debug, Clone)]
pub struct ReadPoller {
    max_attempts: u32,
    interval: Duration,
}

impl Default for ReadPoller {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ReadPoller {
    /// `max_attempts` is clamped to at least one query.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for `handle` to finish, sleeping `interval` before every query.
    pub async fn wait(&self, vision: &dyn VisionService, handle: &OperationHandle) -> PollReport {
        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(self.interval).await;

            let result = match vision.read_result(handle).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(operation = %handle, attempt, error = %e, "Read status query failed");
                    return PollReport {
                        outcome: TextRecognition::unavailable(e.to_string()),
                        attempts: attempt,
                    };
                }
            };
            debug!(operation = %handle, attempt, status = %result.status, "Read status");

            if result.status.is_pending() {
                continue;
            }

            let outcome = match result.status {
                ReadStatus::Succeeded if !result.lines.is_empty() => {
                    TextRecognition::Recognized(result.lines.join(" "))
                }
                ReadStatus::Succeeded => TextRecognition::Fallback(FallbackReason::NoText),
                status => {
                    warn!(operation = %handle, attempt, status = %status, "Read operation failed");
                    TextRecognition::Fallback(FallbackReason::Failed { status })
                }
            };
            return PollReport {
                outcome,
                attempts: attempt,
            };
        }

        info!(
            operation = %handle,
            attempts = self.max_attempts,
            "Read operation still pending after attempt budget"
        );
        PollReport {
            outcome: TextRecognition::Fallback(FallbackReason::Exhausted {
                attempts: self.max_attempts,
            }),
            attempts: self.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedVision;
    use smartvision_core::ReadResult;

    fn handle() -> OperationHandle {
        OperationHandle::new("op-1")
    }

    fn instant_poller() -> ReadPoller {
        ReadPoller::new(DEFAULT_MAX_ATTEMPTS, Duration::ZERO)
    }

    #[tokio::test]
    async fn stops_on_first_success_and_joins_lines() {
        let vision = ScriptedVision::new().with_read_script(vec![
            Ok(ReadResult::with_status(ReadStatus::NotStarted)),
            Ok(ReadResult::with_status(ReadStatus::Running)),
            Ok(ReadResult::succeeded(["STOP", "AHEAD", "slow down"])),
            Ok(ReadResult::succeeded(["never", "read"])),
        ]);

        let report = instant_poller().wait(&vision, &handle()).await;
        assert_eq!(report.attempts, 3);
        assert_eq!(report.outcome, TextRecognition::Recognized("STOP AHEAD slow down".into()));
        assert_eq!(vision.read_queries(), 3);
    }

    #[tokio::test]
    async fn exhausts_after_budget_while_pending() {
        let vision = ScriptedVision::new().with_read_script(vec![Ok(ReadResult::with_status(
            ReadStatus::Running,
        ))]);

        let report = instant_poller().wait(&vision, &handle()).await;
        assert_eq!(report.attempts, 10);
        assert_eq!(vision.read_queries(), 10);
        assert_eq!(
            report.outcome,
            TextRecognition::Fallback(FallbackReason::Exhausted { attempts: 10 })
        );
        assert_eq!(report.outcome.as_text(), NO_TEXT_FALLBACK);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_the_interval_before_every_query() {
        let vision = ScriptedVision::new().with_read_script(vec![Ok(ReadResult::with_status(
            ReadStatus::NotStarted,
        ))]);
        let poller = ReadPoller::new(10, Duration::from_secs(1));

        let start = tokio::time::Instant::now();
        let report = poller.wait(&vision, &handle()).await;
        assert_eq!(vision.read_queries(), 10);
        assert!(matches!(report.outcome, TextRecognition::Fallback(FallbackReason::Exhausted { .. })));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(10), "waited {elapsed:?}");
        assert!(elapsed < Duration::from_secs(11), "waited {elapsed:?}");
    }

    #[tokio::test]
    async fn failed_status_is_distinct_from_exhaustion() {
        let vision = ScriptedVision::new().with_read_script(vec![
            Ok(ReadResult::with_status(ReadStatus::Running)),
            Ok(ReadResult::with_status(ReadStatus::Failed)),
        ]);

        let report = instant_poller().wait(&vision, &handle()).await;
        assert_eq!(report.attempts, 2);
        assert_eq!(
            report.outcome,
            TextRecognition::Fallback(FallbackReason::Failed { status: ReadStatus::Failed })
        );
        assert_eq!(report.outcome.as_text(), NO_TEXT_FALLBACK);
    }

    #[tokio::test]
    async fn unknown_status_stops_polling() {
        let vision = ScriptedVision::new()
            .with_read_script(vec![Ok(ReadResult::with_status(ReadStatus::Unknown))]);

        let report = instant_poller().wait(&vision, &handle()).await;
        assert_eq!(report.attempts, 1);
        assert!(!report.outcome.is_recognized());
    }

    #[tokio::test]
    async fn success_without_lines_is_no_text() {
        let vision = ScriptedVision::new()
            .with_read_script(vec![Ok(ReadResult::succeeded(Vec::<String>::new()))]);

        let report = instant_poller().wait(&vision, &handle()).await;
        assert_eq!(report.outcome, TextRecognition::Fallback(FallbackReason::NoText));
        assert_eq!(report.outcome.into_text(), NO_TEXT_FALLBACK);
    }

    #[tokio::test]
    async fn query_error_degrades_to_unavailable() {
        let vision = ScriptedVision::new().with_read_script(vec![
            Ok(ReadResult::with_status(ReadStatus::Running)),
            Err("connection reset".to_string()),
        ]);

        let report = instant_poller().wait(&vision, &handle()).await;
        assert_eq!(report.attempts, 2);
        assert_eq!(report.outcome.as_text(), UNAVAILABLE_FALLBACK);
        match report.outcome {
            TextRecognition::Fallback(FallbackReason::Unavailable { reason }) => {
                assert!(reason.contains("connection reset"))
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn zero_attempts_is_clamped() {
        assert_eq!(ReadPoller::new(0, Duration::ZERO).max_attempts(), 1);
    }
}
