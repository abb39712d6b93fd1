use collector_domain::{
    EventStore, EventValidator, FailureReason, IngestError, IngestResult, MetricsSink,
    ValidatedEvent, ValidationFailure,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Terminal decision for one message, owned by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Consume the message; the broker will not redeliver it
    Ack,
    /// Leave the message for redelivery
    Redeliver,
}

/// The ingestion pipeline for one logical channel.
///
/// Sequences validate → persist and owns the acknowledgment decision:
/// - structurally invalid payloads are consumed and dropped (redelivery
///   cannot fix them, and acking avoids a poison-message loop),
/// - storage failures are left unacknowledged so the broker retries the
///   whole sequence, which is safe because validation is stateless and
///   persistence tolerates re-application.
///
/// Every invocation terminates with exactly one duration observation and a
/// disposition; no error escapes.
pub struct EventIngestService {
    validator: EventValidator,
    store: Arc<dyn EventStore>,
    metrics: Arc<dyn MetricsSink>,
    /// Channel identifier bound at subscription time, used as the metrics
    /// source label on failures (an invalid payload may lack a source field)
    channel_source: String,
}

impl EventIngestService {
    pub fn new(
        store: Arc<dyn EventStore>,
        metrics: Arc<dyn MetricsSink>,
        channel_source: impl Into<String>,
    ) -> Self {
        Self {
            validator: EventValidator::new(),
            store,
            metrics,
            channel_source: channel_source.into(),
        }
    }

    /// Process one message body to a terminal disposition.
    pub async fn process(&self, payload: &[u8]) -> Disposition {
        let started = Instant::now();
        let result = self.ingest(payload).await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(event) => {
                self.metrics.events_processed(&event.source);
                self.metrics.processing_duration(&event.source, elapsed);
                info!(
                    event_id = %event.event_id,
                    source = %event.source,
                    duration_secs = elapsed,
                    "event processed"
                );
                Disposition::Ack
            }
            Err(IngestError::Validation(failure)) => {
                warn!(validation_issues = %failure, "event validation failed");
                self.metrics
                    .events_failed(&self.channel_source, FailureReason::ValidationError);
                self.metrics
                    .processing_duration(&self.channel_source, elapsed);
                Disposition::Ack
            }
            Err(IngestError::Storage(e)) => {
                error!(error = %e, "event persistence failed");
                self.metrics
                    .events_failed(&self.channel_source, FailureReason::ProcessingError);
                self.metrics
                    .processing_duration(&self.channel_source, elapsed);
                Disposition::Redeliver
            }
        }
    }

    async fn ingest(&self, payload: &[u8]) -> IngestResult<ValidatedEvent> {
        let value: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| ValidationFailure::single("", format!("body is not valid JSON: {}", e)))?;

        let event = self.validator.validate(&value)?;

        debug!(
            event_id = %event.event_id,
            source = %event.source,
            event_type = %event.event_type,
            funnel_stage = %event.funnel_stage,
            "event validated"
        );

        self.store.persist(&event).await?;

        debug!(event_id = %event.event_id, "event persisted");
        Ok(event)
    }
}
