//! Schema validation for inbound behavioral events.

use crate::error::{FieldIssue, ValidationFailure};
use crate::event::{RawEventPayload, ValidatedEvent};
use chrono::{DateTime, Utc};
use jsonschema::Validator;
use serde::Deserialize;

/// JSON Schema for the producer contract (Draft 2020-12).
///
/// Structural checks only: leaf fields of `data` are optional or nullable
/// where the producer allows it (e.g. `videoId`). Timestamp format is
/// enforced separately with a real date-time parse.
const EVENT_SCHEMA: &str = r#"{
    "$schema": "https://json-schema.org/draft/2020-12/schema",
    "type": "object",
    "required": ["eventId", "timestamp", "source", "funnelStage", "eventType", "data"],
    "properties": {
        "eventId": { "type": "string", "minLength": 1 },
        "timestamp": { "type": "string" },
        "source": { "type": "string" },
        "funnelStage": { "type": "string" },
        "eventType": { "type": "string" },
        "data": {
            "type": "object",
            "required": ["user", "engagement"],
            "properties": {
                "user": {
                    "type": "object",
                    "required": ["userId"],
                    "properties": {
                        "userId": { "type": "string" },
                        "name": { "type": "string" },
                        "age": { "type": "integer" },
                        "gender": { "type": "string" },
                        "location": {
                            "type": "object",
                            "properties": {
                                "country": { "type": "string" },
                                "city": { "type": "string" }
                            }
                        }
                    }
                },
                "engagement": {
                    "type": "object",
                    "properties": {
                        "actionTime": { "type": "string" },
                        "referrer": { "type": "string" },
                        "videoId": { "type": ["string", "null"] }
                    }
                }
            }
        }
    }
}"#;

/// Typed shape of a payload that passed the structural check. The timestamp
/// stays a string here; parsing it is the validator's last step.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    event_id: String,
    timestamp: String,
    source: String,
    funnel_stage: String,
    event_type: String,
    data: serde_json::Value,
}

/// Pure validator: untyped payload in, typed event or structured failure out.
///
/// Deterministic and total; every input maps to exactly one of the two
/// outcomes, and validation never has side effects. Collects all field-level
/// issues with their instance paths rather than stopping at the first.
pub struct EventValidator {
    schema: Validator,
}

impl EventValidator {
    pub fn new() -> Self {
        let schema_value: serde_json::Value =
            serde_json::from_str(EVENT_SCHEMA).expect("embedded event schema is valid JSON");
        let schema =
            Validator::new(&schema_value).expect("embedded event schema is a valid JSON Schema");
        Self { schema }
    }

    pub fn validate(&self, payload: &RawEventPayload) -> Result<ValidatedEvent, ValidationFailure> {
        let issues: Vec<FieldIssue> = self
            .schema
            .iter_errors(payload)
            .map(|error| FieldIssue {
                path: error.instance_path.to_string(),
                reason: error.to_string(),
            })
            .collect();

        if !issues.is_empty() {
            return Err(ValidationFailure::new(issues));
        }

        // The structural pass guarantees this deserialization succeeds; a
        // failure here would mean the schema and the typed shape diverged.
        let raw: RawEvent = serde_json::from_value(payload.clone())
            .map_err(|e| ValidationFailure::single("", format!("payload shape mismatch: {}", e)))?;

        let timestamp = DateTime::parse_from_rfc3339(&raw.timestamp)
            .map_err(|e| {
                ValidationFailure::single(
                    "/timestamp",
                    format!("not a valid ISO-8601 date-time: {}", e),
                )
            })?
            .with_timezone(&Utc);

        Ok(ValidatedEvent {
            event_id: raw.event_id,
            timestamp,
            source: raw.source,
            funnel_stage: raw.funnel_stage,
            event_type: raw.event_type,
            data: raw.data,
        })
    }
}

impl Default for EventValidator {
    fn default() -> Self {
        Self::new()
    }
}
