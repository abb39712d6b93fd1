use crate::domain::EventIngestService;
use crate::nats::EventConsumerService;
use collector_domain::{EventStore, MetricsSink};
use collector_nats::{ChannelConsumer, ConsumeLoggingLayer, ConsumeLoggingService, NatsClient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tracing::info;

pub struct IngestWorkerConfig {
    pub stream: String,
    pub subject: String,
    pub durable_name: String,
    /// Channel identity used as the failure-metrics source label
    pub source: String,
    pub nats_batch_size: usize,
    pub nats_batch_wait_secs: u64,
}

type LayeredIngestService = ConsumeLoggingService<EventConsumerService>;

/// One ingestion worker: a durable consumer on a single channel subject,
/// wired through the logging middleware into the ingestion pipeline.
pub struct IngestWorker {
    consumer: ChannelConsumer<LayeredIngestService>,
}

impl IngestWorker {
    pub async fn new(
        store: Arc<dyn EventStore>,
        metrics: Arc<dyn MetricsSink>,
        nats_client: &NatsClient,
        config: IngestWorkerConfig,
    ) -> anyhow::Result<Self> {
        info!(
            stream = %config.stream,
            subject = %config.subject,
            durable = %config.durable_name,
            "initializing ingest worker"
        );

        let ingest_service = Arc::new(EventIngestService::new(store, metrics, &config.source));

        let service = ServiceBuilder::new()
            .layer(ConsumeLoggingLayer::new())
            .service(EventConsumerService::new(ingest_service));

        let consumer = ChannelConsumer::new(
            nats_client.consumer_client(),
            &config.stream,
            &config.durable_name,
            &config.subject,
            config.nats_batch_size,
            config.nats_batch_wait_secs,
            service,
        )
        .await?;

        info!("ingest worker initialized");

        Ok(Self { consumer })
    }

    pub async fn run(self, ctx: CancellationToken) -> anyhow::Result<()> {
        self.consumer.run(ctx).await
    }
}
