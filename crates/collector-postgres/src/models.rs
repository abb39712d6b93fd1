use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row shape of the `events` table.
///
/// Insert-only: rows are created once per accepted event and never updated
/// or deleted. `event_id` is the primary key, which is what makes redelivery
/// of an already-persisted event a no-op.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventRow {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub funnel_stage: String,
    pub event_type: String,
    pub data: serde_json::Value,
    pub ingested_at: DateTime<Utc>,
}

impl From<tokio_postgres::Row> for EventRow {
    fn from(row: tokio_postgres::Row) -> Self {
        EventRow {
            event_id: row.get("event_id"),
            timestamp: row.get("timestamp"),
            funnel_stage: row.get("funnel_stage"),
            event_type: row.get("event_type"),
            data: row.get("data"),
            ingested_at: row.get("ingested_at"),
        }
    }
}
