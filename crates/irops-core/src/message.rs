use crate::domain::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a mailbox message.
pub type MessageId = Uuid;

/// A message exchanged between workers through the mailbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message.
    pub id: MessageId,
    /// Registry name of the sending worker (or `coordinator`).
    pub sender: String,
    /// Registry name of the receiving worker (or `system`).
    pub receiver: String,
    /// Routing label, e.g. `maintenance_status`.
    pub message_type: String,
    /// Opaque JSON payload.
    pub content: serde_json::Value,
    /// Disruption this message concerns, if any.
    #[serde(default)]
    pub disruption_id: Option<JobId>,
    /// Flipped to true once the receiver has consumed the message.
    #[serde(default)]
    pub processed: bool,
    /// UTC timestamp of when the message was created.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a new, unprocessed message.
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        message_type: impl Into<String>,
        content: serde_json::Value,
        disruption_id: Option<JobId>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: sender.into(),
            receiver: receiver.into(),
            message_type: message_type.into(),
            content,
            disruption_id,
            processed: false,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::new(
            "crew_scheduling",
            "passenger_rebooking",
            "crew_availability",
            serde_json::json!({"crews_affected": 4}),
            Some(12),
        );
        assert!(!msg.processed);
        assert_eq!(msg.disruption_id, Some(12));
        assert_eq!(msg.content["crews_affected"], 4);
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::new("a", "b", "ping", serde_json::json!({"a": 1}), None);
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
