use crate::store::{MessageQuery, Store};
use async_trait::async_trait;
use irops_core::{Disruption, Flight, FlightId, IropsResult, JobId, Message, MessageId, WorkerRecord};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local store. Cloning shares the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    disruptions: Arc<RwLock<BTreeMap<JobId, Disruption>>>,
    flights: Arc<RwLock<BTreeMap<FlightId, Flight>>>,
    workers: Arc<RwLock<BTreeMap<String, WorkerRecord>>>,
    // Insertion order doubles as the timestamp tie-break.
    messages: Arc<RwLock<Vec<Message>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }
}

fn sorted_oldest_first(mut msgs: Vec<Message>) -> Vec<Message> {
    // Stable: equal timestamps keep insertion order.
    msgs.sort_by_key(|m| m.timestamp);
    msgs
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_disruption(&self, id: JobId) -> IropsResult<Option<Disruption>> {
        Ok(self.disruptions.read().await.get(&id).cloned())
    }

    async fn put_disruption(&self, disruption: &Disruption) -> IropsResult<()> {
        self.disruptions
            .write()
            .await
            .insert(disruption.id, disruption.clone());
        Ok(())
    }

    async fn list_disruptions(&self) -> IropsResult<Vec<Disruption>> {
        Ok(self.disruptions.read().await.values().cloned().collect())
    }

    async fn get_flights(&self, ids: &[FlightId]) -> IropsResult<Vec<Flight>> {
        let flights = self.flights.read().await;
        Ok(ids.iter().filter_map(|id| flights.get(id).cloned()).collect())
    }

    async fn put_flight(&self, flight: &Flight) -> IropsResult<()> {
        self.flights
            .write()
            .await
            .insert(flight.id.clone(), flight.clone());
        Ok(())
    }

    async fn list_flights(&self) -> IropsResult<Vec<Flight>> {
        Ok(self.flights.read().await.values().cloned().collect())
    }

    async fn upsert_worker(&self, record: &WorkerRecord) -> IropsResult<()> {
        self.workers
            .write()
            .await
            .insert(record.name.clone(), record.clone());
        Ok(())
    }

    async fn list_workers(&self) -> IropsResult<Vec<WorkerRecord>> {
        Ok(self.workers.read().await.values().cloned().collect())
    }

    async fn insert_message(&self, message: &Message) -> IropsResult<()> {
        self.messages.write().await.push(message.clone());
        Ok(())
    }

    async fn query_messages(&self, query: &MessageQuery) -> IropsResult<Vec<Message>> {
        let msgs = self.messages.read().await;
        let matched = msgs.iter().filter(|m| query.matches(m)).cloned().collect();
        Ok(sorted_oldest_first(matched))
    }

    async fn claim_messages(&self, query: &MessageQuery) -> IropsResult<Vec<Message>> {
        let query = MessageQuery {
            unprocessed_only: true,
            ..query.clone()
        };
        // Select and flag under one write lock.
        let mut msgs = self.messages.write().await;
        let mut claimed = Vec::new();
        for msg in msgs.iter_mut().filter(|m| query.matches(m)) {
            msg.processed = true;
            claimed.push(msg.clone());
        }
        Ok(sorted_oldest_first(claimed))
    }

    async fn mark_processed(&self, id: MessageId) -> IropsResult<bool> {
        let mut msgs = self.messages.write().await;
        match msgs.iter_mut().find(|m| m.id == id) {
            Some(msg) => {
                msg.processed = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn recent_messages(&self, limit: usize) -> IropsResult<Vec<Message>> {
        let msgs = self.messages.read().await;
        let mut all = sorted_oldest_first(msgs.clone());
        all.reverse();
        all.truncate(limit);
        Ok(all)
    }
}
