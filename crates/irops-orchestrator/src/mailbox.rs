use irops_core::{IropsResult, JobId, Message, MessageId};
use irops_store::{MessageQuery, Store};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Persisted queue of inter-worker messages.
///
/// Sends never fail the caller. Reads through [`Mailbox::pending`] are
/// read-once: returned messages are flagged processed in the same step.
#[derive(Clone)]
pub struct Mailbox {
    store: Arc<dyn Store>,
}

impl Mailbox {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Append an unprocessed message. Returns `None` when storage failed.
    pub async fn send(
        &self,
        sender: &str,
        receiver: &str,
        message_type: &str,
        content: Value,
        disruption_id: Option<JobId>,
    ) -> Option<MessageId> {
        let msg = Message::new(sender, receiver, message_type, content, disruption_id);
        match self.store.insert_message(&msg).await {
            Ok(()) => {
                info!(sender, receiver, message_type, disruption_id = ?disruption_id, "Message sent");
                Some(msg.id)
            }
            Err(e) => {
                error!(sender, receiver, message_type, error = %e, "Failed to send message");
                None
            }
        }
    }

    /// Unprocessed messages for `receiver`, oldest first, flagged processed
    /// as they are returned.
    pub async fn pending(
        &self,
        receiver: &str,
        disruption_id: Option<JobId>,
        sender: Option<&str>,
    ) -> IropsResult<Vec<Message>> {
        let query = MessageQuery::pending_for(receiver)
            .with_disruption(disruption_id)
            .with_sender(sender.map(str::to_string));
        let messages = self.store.claim_messages(&query).await?;
        debug!(receiver, count = messages.len(), "Pending messages consumed");
        Ok(messages)
    }

    /// Content of the oldest pending message from `sender` about
    /// `disruption_id`, or `{}` when there is none. Consumes every matching
    /// message.
    pub async fn context_from(&self, receiver: &str, disruption_id: JobId, sender: &str) -> Value {
        match self.pending(receiver, Some(disruption_id), Some(sender)).await {
            Ok(messages) => messages
                .into_iter()
                .next()
                .map(|m| m.content)
                .unwrap_or_else(|| Value::Object(Default::default())),
            Err(e) => {
                error!(receiver, sender, disruption_id, error = %e, "Failed to read context messages");
                Value::Object(Default::default())
            }
        }
    }

    /// Idempotent. Unknown ids are logged and ignored.
    pub async fn mark_processed(&self, id: MessageId) {
        match self.store.mark_processed(id).await {
            Ok(true) => debug!(message_id = %id, "Message marked processed"),
            Ok(false) => warn!(message_id = %id, "mark_processed: unknown message id"),
            Err(e) => error!(message_id = %id, error = %e, "Failed to mark message processed"),
        }
    }

    /// Every message tagged with `disruption_id`, oldest first.
    pub async fn history(&self, disruption_id: JobId) -> IropsResult<Vec<Message>> {
        self.store
            .query_messages(&MessageQuery::for_disruption(disruption_id))
            .await
    }

    /// Newest first.
    pub async fn recent(&self, limit: usize) -> IropsResult<Vec<Message>> {
        self.store.recent_messages(limit).await
    }
}
