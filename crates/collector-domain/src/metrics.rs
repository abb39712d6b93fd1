/// Why a message failed terminally. The label strings are part of the
/// metrics contract and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Payload failed schema validation; the message was consumed and dropped
    ValidationError,
    /// Persistence (or anything after validation) failed; redelivery retries
    ProcessingError,
}

impl FailureReason {
    pub fn as_label(&self) -> &'static str {
        match self {
            FailureReason::ValidationError => "validation_error",
            FailureReason::ProcessingError => "processing_error",
        }
    }
}

/// Outcome counters and the per-message duration histogram.
///
/// All calls are fire-and-forget: implementations must not surface a failure
/// mode to the caller. The pipeline observes the duration exactly once per
/// message, on every terminal outcome.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait MetricsSink: Send + Sync {
    /// One successful end-to-end completion
    fn events_processed(&self, source: &str);

    /// One terminal failure, classified
    fn events_failed(&self, source: &str, reason: FailureReason);

    /// Wall-clock seconds from message receipt to terminal resolution
    fn processing_duration(&self, source: &str, seconds: f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason_labels() {
        assert_eq!(FailureReason::ValidationError.as_label(), "validation_error");
        assert_eq!(FailureReason::ProcessingError.as_label(), "processing_error");
    }
}
