use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The untyped message body before validation. Carries no invariants;
/// may be arbitrarily malformed.
pub type RawEventPayload = serde_json::Value;

/// A behavioral event that passed schema validation.
///
/// Only the validator's success path constructs one of these: holding a
/// `ValidatedEvent` means the payload matched the producer contract and the
/// timestamp parsed as a real instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedEvent {
    /// Opaque unique identifier assigned upstream
    pub event_id: String,
    /// Event instant, parsed from the payload's ISO-8601 string
    pub timestamp: DateTime<Utc>,
    /// Producing channel (one fixed value per subject, e.g. "facebook")
    pub source: String,
    /// Free-form funnel classification label
    pub funnel_stage: String,
    /// Free-form event classification label
    pub event_type: String,
    /// Nested user/engagement payload, opaque beyond structural validation
    pub data: serde_json::Value,
}
