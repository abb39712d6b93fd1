use crate::domain::{Disposition, EventIngestService};
use collector_nats::{InboundMessage, MessageDisposition};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

/// Tower service adapting the ingestion pipeline to the pull-consumer loop.
///
/// The domain service already logs and records metrics for every outcome, so
/// this layer only translates its disposition into the broker-facing one.
/// Redeliveries carry no reason string; the details are in the logs.
#[derive(Clone)]
pub struct EventConsumerService {
    ingest_service: Arc<EventIngestService>,
}

impl EventConsumerService {
    pub fn new(ingest_service: Arc<EventIngestService>) -> Self {
        Self { ingest_service }
    }
}

impl Service<InboundMessage> for EventConsumerService {
    type Response = MessageDisposition;
    type Error = anyhow::Error;
    type Future = BoxFuture<'static, Result<MessageDisposition, anyhow::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: InboundMessage) -> Self::Future {
        let ingest_service = Arc::clone(&self.ingest_service);

        Box::pin(async move {
            let disposition = ingest_service.process(&req.payload).await;

            Ok(match disposition {
                Disposition::Ack => MessageDisposition::ack(),
                Disposition::Redeliver => MessageDisposition::redeliver_silent(),
            })
        })
    }
}
