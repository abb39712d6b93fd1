use crate::client::PostgresClient;
use crate::models::EventRow;
use async_trait::async_trait;
use collector_domain::{EventStore, StorageError, ValidatedEvent};
use tracing::{debug, instrument};

/// PostgreSQL implementation of the [`EventStore`] gateway.
///
/// Inserts are keyed by `event_id` with `ON CONFLICT DO NOTHING`, so a
/// redelivered event whose first delivery was persisted but not acknowledged
/// commits nothing the second time instead of failing. All backend errors
/// surface uniformly as [`StorageError`].
#[derive(Clone)]
pub struct PostgresEventStore {
    client: PostgresClient,
}

impl PostgresEventStore {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }

    /// Fetch one persisted event by id. Used by tests and tooling; the
    /// pipeline itself never reads back.
    pub async fn get_event(&self, event_id: &str) -> Result<Option<EventRow>, StorageError> {
        let conn = self.client.get_connection().await.map_err(StorageError::new)?;

        let row = conn
            .query_opt(
                "SELECT event_id, timestamp, funnel_stage, event_type, data, ingested_at
                 FROM events
                 WHERE event_id = $1",
                &[&event_id],
            )
            .await
            .map_err(StorageError::new)?;

        Ok(row.map(EventRow::from))
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[instrument(skip(self, event), fields(event_id = %event.event_id, source = %event.source))]
    async fn persist(&self, event: &ValidatedEvent) -> Result<(), StorageError> {
        let conn = self.client.get_connection().await.map_err(StorageError::new)?;

        let rows = conn
            .execute(
                "INSERT INTO events (event_id, timestamp, funnel_stage, event_type, data)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (event_id) DO NOTHING",
                &[
                    &event.event_id,
                    &event.timestamp,
                    &event.funnel_stage,
                    &event.event_type,
                    &event.data,
                ],
            )
            .await
            .map_err(StorageError::new)?;

        if rows == 0 {
            debug!(event_id = %event.event_id, "event already persisted, skipping duplicate");
        } else {
            debug!(event_id = %event.event_id, "event persisted");
        }

        Ok(())
    }
}
