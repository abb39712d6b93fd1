use collector_domain::{FailureReason, MetricsSink};
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use tracing::warn;

/// Prometheus-backed [`MetricsSink`].
///
/// Registers on the injected registry:
/// - `events_processed_total{source}`
/// - `events_failed_total{source, reason}`
/// - `event_processing_duration_seconds{source}`
#[derive(Clone)]
pub struct PrometheusMetricsSink {
    events_processed: IntCounterVec,
    events_failed: IntCounterVec,
    processing_duration: HistogramVec,
}

impl PrometheusMetricsSink {
    pub fn new(registry: &Registry) -> Self {
        let events_processed = IntCounterVec::new(
            Opts::new(
                "events_processed_total",
                "Total number of events validated, persisted and acknowledged",
            ),
            &["source"],
        )
        .expect("valid metric opts for events_processed_total");

        let events_failed = IntCounterVec::new(
            Opts::new(
                "events_failed_total",
                "Total number of events that failed terminally, by reason",
            ),
            &["source", "reason"],
        )
        .expect("valid metric opts for events_failed_total");

        let processing_duration = HistogramVec::new(
            HistogramOpts::new(
                "event_processing_duration_seconds",
                "Wall-clock seconds from message receipt to terminal resolution",
            ),
            &["source"],
        )
        .expect("valid metric opts for event_processing_duration_seconds");

        for metric in [
            Box::new(events_processed.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(events_failed.clone()),
            Box::new(processing_duration.clone()),
        ] {
            if let Err(e) = registry.register(metric) {
                warn!(error = %e, "failed to register collector metric");
            }
        }

        Self {
            events_processed,
            events_failed,
            processing_duration,
        }
    }
}

impl MetricsSink for PrometheusMetricsSink {
    fn events_processed(&self, source: &str) {
        self.events_processed.with_label_values(&[source]).inc();
    }

    fn events_failed(&self, source: &str, reason: FailureReason) {
        self.events_failed
            .with_label_values(&[source, reason.as_label()])
            .inc();
    }

    fn processing_duration(&self, source: &str, seconds: f64) {
        self.processing_duration
            .with_label_values(&[source])
            .observe(seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_value(registry: &Registry, name: &str, labels: &[(&str, &str)]) -> f64 {
        for family in registry.gather() {
            if family.get_name() != name {
                continue;
            }
            for metric in family.get_metric() {
                let matches = labels.iter().all(|(key, value)| {
                    metric
                        .get_label()
                        .iter()
                        .any(|pair| pair.get_name() == *key && pair.get_value() == *value)
                });
                if matches {
                    return metric.get_counter().get_value();
                }
            }
        }
        0.0
    }

    #[test]
    fn test_processed_counter_increments_by_source() {
        let registry = Registry::new();
        let sink = PrometheusMetricsSink::new(&registry);

        sink.events_processed("facebook");
        sink.events_processed("facebook");

        let value = counter_value(
            &registry,
            "events_processed_total",
            &[("source", "facebook")],
        );
        assert_eq!(value, 2.0);
    }

    #[test]
    fn test_failed_counter_carries_reason_label() {
        let registry = Registry::new();
        let sink = PrometheusMetricsSink::new(&registry);

        sink.events_failed("facebook", FailureReason::ValidationError);
        sink.events_failed("facebook", FailureReason::ProcessingError);

        let validation = counter_value(
            &registry,
            "events_failed_total",
            &[("source", "facebook"), ("reason", "validation_error")],
        );
        let processing = counter_value(
            &registry,
            "events_failed_total",
            &[("source", "facebook"), ("reason", "processing_error")],
        );
        assert_eq!(validation, 1.0);
        assert_eq!(processing, 1.0);
    }

    #[test]
    fn test_duration_histogram_observes() {
        let registry = Registry::new();
        let sink = PrometheusMetricsSink::new(&registry);

        sink.processing_duration("facebook", 0.25);

        let family = registry
            .gather()
            .into_iter()
            .find(|f| f.get_name() == "event_processing_duration_seconds")
            .unwrap();
        let histogram = family.get_metric()[0].get_histogram();
        assert_eq!(histogram.get_sample_count(), 1);
        assert!((histogram.get_sample_sum() - 0.25).abs() < f64::EPSILON);
    }
}
