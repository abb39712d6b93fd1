use crate::error::StorageError;
use crate::event::ValidatedEvent;
use async_trait::async_trait;

/// Narrow gateway to durable event storage.
///
/// A successful return means the record is durably committed per the
/// backend's durability contract. No retries at this layer; retry, if any,
/// is the broker's responsibility via redelivery. Implementations must be
/// safe under redelivery of an already-persisted event.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist one validated event.
    async fn persist(&self, event: &ValidatedEvent) -> Result<(), StorageError>;
}
