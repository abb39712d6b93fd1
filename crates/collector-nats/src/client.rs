use crate::traits::{DeliveredMessage, JetStreamConsumer, PullConsumer};
use anyhow::{Context, Result};
use async_nats::jetstream::{self, stream::Config as StreamConfig};
use async_nats::HeaderMap;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{error, info};

/// NATS connection wrapper owning the JetStream context.
pub struct NatsClient {
    client: async_nats::Client,
    jetstream: jetstream::Context,
}

impl NatsClient {
    pub async fn connect(url: &str, timeout: std::time::Duration) -> Result<Self> {
        info!(url = %url, timeout_ms = timeout.as_millis(), "connecting to NATS");

        let client = async_nats::ConnectOptions::new()
            .connection_timeout(timeout)
            .connect(url)
            .await
            .context("failed to connect to NATS")?;

        let jetstream = jetstream::new(client.clone());

        info!("connected to NATS");
        Ok(Self { client, jetstream })
    }

    /// Create the stream if it does not already exist. Subjects default to
    /// `{stream}.*` so one stream fans out to per-channel subjects.
    pub async fn ensure_stream(&self, stream_name: &str) -> Result<()> {
        let stream_config = StreamConfig {
            name: stream_name.to_string(),
            subjects: vec![format!("{}.*", stream_name)],
            description: Some("inbound behavioral events".to_string()),
            ..Default::default()
        };

        match self.jetstream.get_stream(stream_name).await {
            Ok(_) => {
                info!(stream = %stream_name, "stream already exists");
            }
            Err(_) => {
                self.jetstream
                    .create_stream(stream_config)
                    .await
                    .context("failed to create stream")?;
                info!(stream = %stream_name, "created stream");
            }
        }

        Ok(())
    }

    /// Create a JetStreamConsumer trait object from this client
    pub fn consumer_client(&self) -> Arc<dyn JetStreamConsumer> {
        Arc::new(JetStreamConsumerClient {
            context: self.jetstream.clone(),
        })
    }

    pub async fn close(self) {
        info!("closing NATS connection");
        if let Err(e) = self.client.flush().await {
            error!(error = %e, "failed to flush NATS client before close");
        }
        // Connection closes when the client is dropped
    }
}

/// Concrete [`JetStreamConsumer`] backed by async-nats
struct JetStreamConsumerClient {
    context: jetstream::Context,
}

#[async_trait]
impl JetStreamConsumer for JetStreamConsumerClient {
    async fn create_consumer(
        &self,
        config: jetstream::consumer::pull::Config,
        stream_name: &str,
    ) -> Result<Box<dyn PullConsumer>> {
        let consumer = self
            .context
            .create_consumer_on_stream(config, stream_name)
            .await
            .context("failed to create consumer")?;

        Ok(Box::new(NatsPullConsumer { consumer }))
    }
}

/// Concrete [`PullConsumer`] backed by async-nats
struct NatsPullConsumer {
    consumer: jetstream::consumer::PullConsumer,
}

#[async_trait]
impl PullConsumer for NatsPullConsumer {
    async fn fetch_messages(
        &self,
        max_messages: usize,
        expires: std::time::Duration,
    ) -> Result<Vec<Box<dyn DeliveredMessage>>> {
        use futures::StreamExt;

        let mut messages = self
            .consumer
            .fetch()
            .max_messages(max_messages)
            .expires(expires)
            .messages()
            .await
            .context("failed to fetch messages")?;

        let mut fetched: Vec<Box<dyn DeliveredMessage>> = Vec::new();
        while let Some(msg) = messages.next().await {
            match msg {
                Ok(message) => fetched.push(Box::new(JetStreamMessage { message })),
                Err(e) => {
                    // Keep draining the batch; a bad frame is not fatal
                    error!(error = %e, "error receiving message from batch");
                }
            }
        }
        Ok(fetched)
    }
}

/// Concrete [`DeliveredMessage`] backed by a JetStream message
struct JetStreamMessage {
    message: jetstream::Message,
}

#[async_trait]
impl DeliveredMessage for JetStreamMessage {
    fn subject(&self) -> String {
        self.message.subject.to_string()
    }

    fn payload(&self) -> Bytes {
        self.message.payload.clone()
    }

    fn headers(&self) -> Option<HeaderMap> {
        self.message.headers.clone()
    }

    async fn ack(&self) -> Result<()> {
        self.message
            .ack()
            .await
            .map_err(|e| anyhow::anyhow!("failed to ack message: {}", e))
    }

    async fn nak(&self) -> Result<()> {
        self.message
            .ack_with(jetstream::AckKind::Nak(None))
            .await
            .map_err(|e| anyhow::anyhow!("failed to nak message: {}", e))
    }
}
