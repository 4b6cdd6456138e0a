use async_trait::async_trait;
use irops_core::{Disruption, Flight, FlightId, IropsResult, JobId, Message, MessageId, WorkerRecord};

/// Filter for mailbox reads. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageQuery {
    pub receiver: Option<String>,
    pub disruption_id: Option<JobId>,
    pub sender: Option<String>,
    pub unprocessed_only: bool,
}

impl MessageQuery {
    /// Unprocessed messages addressed to `receiver`.
    pub fn pending_for(receiver: impl Into<String>) -> Self {
        Self {
            receiver: Some(receiver.into()),
            unprocessed_only: true,
            ..Self::default()
        }
    }

    /// Every message tagged with `disruption_id`, processed or not.
    pub fn for_disruption(disruption_id: JobId) -> Self {
        Self {
            disruption_id: Some(disruption_id),
            ..Self::default()
        }
    }

    pub fn with_disruption(mut self, disruption_id: Option<JobId>) -> Self {
        self.disruption_id = disruption_id;
        self
    }

    pub fn with_sender(mut self, sender: Option<String>) -> Self {
        self.sender = sender;
        self
    }

    /// In-process evaluation of the filter, shared by backends that cannot
    /// push it down.
    pub fn matches(&self, msg: &Message) -> bool {
        if self.unprocessed_only && msg.processed {
            return false;
        }
        if let Some(receiver) = &self.receiver {
            if &msg.receiver != receiver {
                return false;
            }
        }
        if let Some(sender) = &self.sender {
            if &msg.sender != sender {
                return false;
            }
        }
        if let Some(id) = self.disruption_id {
            if msg.disruption_id != Some(id) {
                return false;
            }
        }
        true
    }
}

/// Shared storage handle: disruptions and flights (read-mostly), worker
/// records, and the mailbox's message collection.
///
/// Message reads return oldest first, ties broken by insertion order.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_disruption(&self, id: JobId) -> IropsResult<Option<Disruption>>;
    async fn put_disruption(&self, disruption: &Disruption) -> IropsResult<()>;
    async fn list_disruptions(&self) -> IropsResult<Vec<Disruption>>;

    /// Flights whose id is in `ids`, in the order requested. Unknown ids are
    /// skipped.
    async fn get_flights(&self, ids: &[FlightId]) -> IropsResult<Vec<Flight>>;
    async fn put_flight(&self, flight: &Flight) -> IropsResult<()>;
    async fn list_flights(&self) -> IropsResult<Vec<Flight>>;

    async fn upsert_worker(&self, record: &WorkerRecord) -> IropsResult<()>;
    async fn list_workers(&self) -> IropsResult<Vec<WorkerRecord>>;

    async fn insert_message(&self, message: &Message) -> IropsResult<()>;
    async fn query_messages(&self, query: &MessageQuery) -> IropsResult<Vec<Message>>;

    /// Atomically select the messages matching `query` that are still
    /// unprocessed, flag them processed, and return them (with
    /// `processed = true`). Two concurrent claims never return the same
    /// message.
    async fn claim_messages(&self, query: &MessageQuery) -> IropsResult<Vec<Message>>;

    /// Flag one message processed. Returns `false` when the id is unknown.
    async fn mark_processed(&self, id: MessageId) -> IropsResult<bool>;

    /// The `limit` newest messages, newest first.
    async fn recent_messages(&self, limit: usize) -> IropsResult<Vec<Message>>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn msg(sender: &str, receiver: &str, disruption: Option<JobId>) -> Message {
        Message::new(sender, receiver, "maintenance_status", json!({}), disruption)
    }

    #[test]
    fn test_pending_filter() {
        let q = MessageQuery::pending_for("crew_scheduling");
        assert!(q.matches(&msg("aircraft_maintenance", "crew_scheduling", None)));
        assert!(!q.matches(&msg("aircraft_maintenance", "airport_resource", None)));

        let mut processed = msg("aircraft_maintenance", "crew_scheduling", None);
        processed.processed = true;
        assert!(!q.matches(&processed));
    }

    #[test]
    fn test_disruption_and_sender_filter() {
        let q = MessageQuery::pending_for("customer_communication")
            .with_disruption(Some(9))
            .with_sender(Some("airport_resource".into()));
        assert!(q.matches(&msg("airport_resource", "customer_communication", Some(9))));
        assert!(!q.matches(&msg("airport_resource", "customer_communication", Some(8))));
        assert!(!q.matches(&msg("airport_resource", "customer_communication", None)));
        assert!(!q.matches(&msg("passenger_rebooking", "customer_communication", Some(9))));
    }

    #[test]
    fn test_history_includes_processed() {
        let q = MessageQuery::for_disruption(4);
        let mut m = msg("coordinator", "system", Some(4));
        m.processed = true;
        assert!(q.matches(&m));
    }
}
