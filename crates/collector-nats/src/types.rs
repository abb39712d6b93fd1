use async_nats::HeaderMap;
use bytes::Bytes;

/// Owned view of one message delivered by the broker.
///
/// The consumer loop builds this from the JetStream message and passes it
/// through the handler stack; the broker message itself stays with the loop,
/// which resolves it (ack or nak) exactly once based on the returned
/// [`MessageDisposition`].
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// The subject the message was published to
    pub subject: String,
    /// The untyped message body
    pub payload: Bytes,
    /// Optional headers delivered with the message
    pub headers: Option<HeaderMap>,
}

impl InboundMessage {
    pub fn new(subject: String, payload: Bytes, headers: Option<HeaderMap>) -> Self {
        Self {
            subject,
            payload,
            headers,
        }
    }
}

/// How the consumer loop should resolve a message after handling.
#[derive(Debug, Clone)]
pub enum MessageDisposition {
    /// Fully handled (or permanently unprocessable): acknowledge, the broker
    /// will not redeliver it
    Ack,
    /// Not durably handled: negative-acknowledge so the broker redelivers
    Redeliver(Option<String>),
}

impl MessageDisposition {
    pub fn ack() -> Self {
        Self::Ack
    }

    pub fn redeliver(reason: impl Into<String>) -> Self {
        Self::Redeliver(Some(reason.into()))
    }

    pub fn redeliver_silent() -> Self {
        Self::Redeliver(None)
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_message_new() {
        let msg = InboundMessage::new(
            "events.facebook".to_string(),
            Bytes::from_static(b"{}"),
            None,
        );

        assert_eq!(msg.subject, "events.facebook");
        assert_eq!(msg.payload, Bytes::from_static(b"{}"));
        assert!(msg.headers.is_none());
    }

    #[test]
    fn test_disposition_ack() {
        assert!(MessageDisposition::ack().is_ack());
    }

    #[test]
    fn test_disposition_redeliver_carries_reason() {
        let disposition = MessageDisposition::redeliver("storage down");
        assert!(!disposition.is_ack());

        match disposition {
            MessageDisposition::Redeliver(Some(reason)) => assert_eq!(reason, "storage down"),
            other => panic!("unexpected disposition: {:?}", other),
        }
    }
}
