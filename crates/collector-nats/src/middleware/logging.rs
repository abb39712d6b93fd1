use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use crate::types::{InboundMessage, MessageDisposition};
use tower::{Layer, Service};
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

/// Tower layer giving each consumed message a fresh correlation id and
/// pre/post log lines.
///
/// The correlation id is generated per message and attached to the span that
/// wraps the handler call, so every log line emitted while processing one
/// message can be joined on it. It is never persisted.
#[derive(Clone, Default)]
pub struct ConsumeLoggingLayer;

impl ConsumeLoggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for ConsumeLoggingLayer {
    type Service = ConsumeLoggingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        ConsumeLoggingService { inner: service }
    }
}

/// Service wrapper implementing the per-message logging contract
#[derive(Clone)]
pub struct ConsumeLoggingService<S> {
    inner: S,
}

impl<S> Service<InboundMessage> for ConsumeLoggingService<S>
where
    S: Service<InboundMessage, Response = MessageDisposition> + Clone + Send + 'static,
    S::Error: std::fmt::Display + Send,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: InboundMessage) -> Self::Future {
        let subject = req.subject.clone();
        let payload_size = req.payload.len();
        let correlation_id = Uuid::new_v4();
        let start = Instant::now();
        let mut inner = self.inner.clone();

        let span = info_span!(
            "consume_message",
            subject = %subject,
            correlation_id = %correlation_id,
        );

        Box::pin(
            async move {
                debug!(payload_bytes = payload_size, "processing message");

                let result = inner.call(req).await;
                let duration_ms = start.elapsed().as_millis();

                match &result {
                    Ok(disposition) => {
                        let outcome = if disposition.is_ack() { "ack" } else { "nak" };
                        info!(
                            payload_bytes = payload_size,
                            outcome = %outcome,
                            duration_ms = %duration_ms,
                            "consumed from {subject} in {duration_ms}ms [{outcome}]"
                        );
                    }
                    Err(e) => {
                        error!(
                            payload_bytes = payload_size,
                            duration_ms = %duration_ms,
                            error = %e,
                            "failed to consume from {subject} in {duration_ms}ms: {e}"
                        );
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}
