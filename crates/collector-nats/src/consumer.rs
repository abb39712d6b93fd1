use crate::traits::{JetStreamConsumer, PullConsumer};
use crate::types::{InboundMessage, MessageDisposition};
use anyhow::{Context, Result};
use async_nats::jetstream;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::Service;
use tracing::{debug, error, info, warn};

/// Durable per-channel consumer that runs each delivered message through a
/// Tower service and resolves its acknowledgment.
///
/// Messages are processed one at a time in delivery order within a fetch
/// batch; outcomes across messages are independent. The loop invokes ack or
/// nak exactly once per message, after the handler returns — never before,
/// so a storage failure leaves the message pending for redelivery.
pub struct ChannelConsumer<S> {
    consumer: Box<dyn PullConsumer>,
    stream_name: String,
    durable_name: String,
    batch_size: usize,
    max_wait: Duration,
    service: S,
}

impl<S> ChannelConsumer<S>
where
    S: Service<InboundMessage, Response = MessageDisposition, Error = anyhow::Error>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    /// Bind a durable pull consumer for one logical channel.
    ///
    /// The durable name is the consumer-group identity: horizontally scaled
    /// instances sharing it split the stream without duplicate delivery.
    pub async fn new(
        jetstream: Arc<dyn JetStreamConsumer>,
        stream_name: &str,
        durable_name: &str,
        filter_subject: &str,
        batch_size: usize,
        max_wait_secs: u64,
        service: S,
    ) -> Result<Self> {
        debug!(
            stream = %stream_name,
            durable = %durable_name,
            filter_subject = %filter_subject,
            "creating channel consumer"
        );

        let config = jetstream::consumer::pull::Config {
            name: Some(durable_name.to_string()),
            durable_name: Some(durable_name.to_string()),
            filter_subject: filter_subject.to_string(),
            ack_policy: jetstream::consumer::AckPolicy::Explicit,
            ..Default::default()
        };

        let consumer = jetstream
            .create_consumer(config, stream_name)
            .await
            .context("failed to create consumer")?;

        debug!(
            stream = %stream_name,
            durable = %durable_name,
            "channel consumer created"
        );

        Ok(Self {
            consumer,
            stream_name: stream_name.to_string(),
            durable_name: durable_name.to_string(),
            batch_size,
            max_wait: Duration::from_secs(max_wait_secs),
            service,
        })
    }

    /// Run the consume loop until cancellation.
    pub async fn run(mut self, ctx: CancellationToken) -> Result<()> {
        info!(
            stream = %self.stream_name,
            durable = %self.durable_name,
            "starting channel consumer"
        );

        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!(
                        stream = %self.stream_name,
                        durable = %self.durable_name,
                        "received shutdown signal, stopping consumer"
                    );
                    break;
                }
                result = self.fetch_and_process() => {
                    if let Err(e) = result {
                        error!(
                            stream = %self.stream_name,
                            durable = %self.durable_name,
                            error = %e,
                            "error processing batch"
                        );
                        // Back off briefly, then keep consuming
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        info!(
            stream = %self.stream_name,
            durable = %self.durable_name,
            "channel consumer stopped"
        );
        Ok(())
    }

    async fn fetch_and_process(&mut self) -> Result<()> {
        let messages = self
            .consumer
            .fetch_messages(self.batch_size, self.max_wait)
            .await?;

        if messages.is_empty() {
            debug!("no messages in batch");
            return Ok(());
        }

        debug!(message_count = messages.len(), "received message batch");

        for msg in &messages {
            let subject = msg.subject();
            let request = InboundMessage::new(subject.clone(), msg.payload(), msg.headers());

            let disposition = match self.service.call(request).await {
                Ok(disposition) => disposition,
                Err(e) => {
                    // Conservative default: when the handler itself fails,
                    // do not ack and let redelivery retry
                    error!(
                        subject = %subject,
                        error = %e,
                        "handler error processing message"
                    );
                    MessageDisposition::redeliver(e.to_string())
                }
            };

            match disposition {
                MessageDisposition::Ack => {
                    if let Err(e) = msg.ack().await {
                        error!(
                            subject = %subject,
                            error = %e,
                            "failed to acknowledge message"
                        );
                    }
                }
                MessageDisposition::Redeliver(reason) => {
                    if let Some(ref r) = reason {
                        warn!(
                            subject = %subject,
                            reason = %r,
                            "leaving message for redelivery"
                        );
                    } else {
                        warn!(
                            subject = %subject,
                            "leaving message for redelivery"
                        );
                    }

                    if let Err(e) = msg.nak().await {
                        error!(
                            subject = %subject,
                            error = %e,
                            "failed to negative-acknowledge message"
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{
        DeliveredMessage, MockDeliveredMessage, MockJetStreamConsumer, MockPullConsumer,
    };
    use bytes::Bytes;
    use futures::future::BoxFuture;
    use std::task::{Context as TaskContext, Poll};

    #[derive(Clone)]
    struct AckAllService;

    impl Service<InboundMessage> for AckAllService {
        type Response = MessageDisposition;
        type Error = anyhow::Error;
        type Future = BoxFuture<'static, Result<MessageDisposition, anyhow::Error>>;

        fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: InboundMessage) -> Self::Future {
            Box::pin(async move { Ok(MessageDisposition::ack()) })
        }
    }

    #[derive(Clone)]
    struct RedeliverAllService;

    impl Service<InboundMessage> for RedeliverAllService {
        type Response = MessageDisposition;
        type Error = anyhow::Error;
        type Future = BoxFuture<'static, Result<MessageDisposition, anyhow::Error>>;

        fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: InboundMessage) -> Self::Future {
            Box::pin(async move { Ok(MessageDisposition::redeliver_silent()) })
        }
    }

    #[derive(Clone)]
    struct FailingService;

    impl Service<InboundMessage> for FailingService {
        type Response = MessageDisposition;
        type Error = anyhow::Error;
        type Future = BoxFuture<'static, Result<MessageDisposition, anyhow::Error>>;

        fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: InboundMessage) -> Self::Future {
            Box::pin(async move { Err(anyhow::anyhow!("handler blew up")) })
        }
    }

    fn delivered_message(expect_acks: usize, expect_naks: usize) -> MockDeliveredMessage {
        let mut msg = MockDeliveredMessage::new();
        msg.expect_subject()
            .return_const("events.facebook".to_string());
        msg.expect_payload().return_const(Bytes::from_static(b"{}"));
        msg.expect_headers()
            .return_const(None::<async_nats::HeaderMap>);
        msg.expect_ack().times(expect_acks).returning(|| Ok(()));
        msg.expect_nak().times(expect_naks).returning(|| Ok(()));
        msg
    }

    async fn consumer_with_batch<S>(
        batch: Vec<Box<dyn DeliveredMessage>>,
        service: S,
    ) -> ChannelConsumer<S>
    where
        S: Service<InboundMessage, Response = MessageDisposition, Error = anyhow::Error>
            + Clone
            + Send
            + 'static,
        S::Future: Send + 'static,
    {
        let mut mock_jetstream = MockJetStreamConsumer::new();

        mock_jetstream
            .expect_create_consumer()
            .times(1)
            .return_once(move |_, _| {
                let mut mock = MockPullConsumer::new();
                mock.expect_fetch_messages()
                    .times(1)
                    .return_once(move |_, _| Ok(batch));
                Ok(Box::new(mock))
            });

        ChannelConsumer::new(
            Arc::new(mock_jetstream),
            "events",
            "fb-collector-facebook",
            "events.facebook",
            10,
            5,
            service,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_consumer_binds_durable_with_explicit_ack() {
        let mut mock_jetstream = MockJetStreamConsumer::new();

        mock_jetstream
            .expect_create_consumer()
            .withf(
                |config: &jetstream::consumer::pull::Config, stream_name: &str| {
                    config.durable_name.as_deref() == Some("fb-collector-facebook")
                        && config.filter_subject == "events.facebook"
                        && config.ack_policy == jetstream::consumer::AckPolicy::Explicit
                        && stream_name == "events"
                },
            )
            .times(1)
            .returning(|_, _| Ok(Box::new(MockPullConsumer::new())));

        let result = ChannelConsumer::new(
            Arc::new(mock_jetstream),
            "events",
            "fb-collector-facebook",
            "events.facebook",
            10,
            5,
            AckAllService,
        )
        .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_consumer_creation_failure_propagates() {
        let mut mock_jetstream = MockJetStreamConsumer::new();

        mock_jetstream
            .expect_create_consumer()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("stream not found")));

        let result = ChannelConsumer::new(
            Arc::new(mock_jetstream),
            "events",
            "fb-collector-facebook",
            "events.facebook",
            10,
            5,
            AckAllService,
        )
        .await;

        assert!(result.is_err());
        let err = result.err().unwrap();
        assert!(err.to_string().contains("failed to create consumer"));
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let mut consumer = consumer_with_batch(vec![], AckAllService).await;
        assert!(consumer.fetch_and_process().await.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let mut mock_jetstream = MockJetStreamConsumer::new();

        mock_jetstream
            .expect_create_consumer()
            .times(1)
            .returning(|_, _| {
                let mut mock = MockPullConsumer::new();
                mock.expect_fetch_messages()
                    .times(1)
                    .returning(|_, _| Err(anyhow::anyhow!("connection reset")));
                Ok(Box::new(mock))
            });

        let mut consumer = ChannelConsumer::new(
            Arc::new(mock_jetstream),
            "events",
            "fb-collector-facebook",
            "events.facebook",
            10,
            5,
            AckAllService,
        )
        .await
        .unwrap();

        assert!(consumer.fetch_and_process().await.is_err());
    }

    #[tokio::test]
    async fn test_ack_disposition_acks_exactly_once() {
        let batch: Vec<Box<dyn DeliveredMessage>> = vec![Box::new(delivered_message(1, 0))];

        let mut consumer = consumer_with_batch(batch, AckAllService).await;
        assert!(consumer.fetch_and_process().await.is_ok());
        // Mock expectations verify on drop: one ack, zero naks
    }

    #[tokio::test]
    async fn test_redeliver_disposition_naks_exactly_once() {
        let batch: Vec<Box<dyn DeliveredMessage>> = vec![Box::new(delivered_message(0, 1))];

        let mut consumer = consumer_with_batch(batch, RedeliverAllService).await;
        assert!(consumer.fetch_and_process().await.is_ok());
    }

    #[tokio::test]
    async fn test_handler_error_naks_instead_of_acking() {
        let batch: Vec<Box<dyn DeliveredMessage>> = vec![Box::new(delivered_message(0, 1))];

        let mut consumer = consumer_with_batch(batch, FailingService).await;
        assert!(consumer.fetch_and_process().await.is_ok());
    }

    #[tokio::test]
    async fn test_each_message_in_batch_resolved_independently() {
        let batch: Vec<Box<dyn DeliveredMessage>> = vec![
            Box::new(delivered_message(1, 0)),
            Box::new(delivered_message(1, 0)),
            Box::new(delivered_message(1, 0)),
        ];

        let mut consumer = consumer_with_batch(batch, AckAllService).await;
        assert!(consumer.fetch_and_process().await.is_ok());
    }

    #[tokio::test]
    async fn test_ack_transport_error_does_not_fail_the_batch() {
        let mut msg = MockDeliveredMessage::new();
        msg.expect_subject()
            .return_const("events.facebook".to_string());
        msg.expect_payload().return_const(Bytes::from_static(b"{}"));
        msg.expect_headers()
            .return_const(None::<async_nats::HeaderMap>);
        msg.expect_ack()
            .times(1)
            .returning(|| Err(anyhow::anyhow!("connection closed")));
        msg.expect_nak().times(0);

        let batch: Vec<Box<dyn DeliveredMessage>> = vec![Box::new(msg)];

        let mut consumer = consumer_with_batch(batch, AckAllService).await;
        assert!(consumer.fetch_and_process().await.is_ok());
    }
}
