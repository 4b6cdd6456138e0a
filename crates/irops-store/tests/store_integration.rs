#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use irops_core::*;
use irops_store::{MemoryStore, MessageQuery, SqliteStore, Store};
use serde_json::json;

fn backends() -> Vec<(&'static str, Arc<dyn Store>)> {
    vec![
        ("memory", Arc::new(MemoryStore::new())),
        ("sqlite", Arc::new(SqliteStore::in_memory().unwrap())),
    ]
}

// ---------------------------------------------------------------------------
// 1. History is oldest first and includes processed messages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn history_is_chronological() {
    for (name, store) in backends() {
        let base = Utc::now();
        for (i, offset) in [2i64, 0, 1].iter().enumerate() {
            let mut m = Message::new("a", "b", "t", json!({"n": i}), Some(1));
            m.timestamp = base + Duration::seconds(*offset);
            store.insert_message(&m).await.unwrap();
        }
        store
            .claim_messages(&MessageQuery::pending_for("b"))
            .await
            .unwrap();

        let history = store
            .query_messages(&MessageQuery::for_disruption(1))
            .await
            .unwrap();
        let order: Vec<i64> = history
            .iter()
            .map(|m| m.content["n"].as_i64().unwrap())
            .collect();
        assert_eq!(order, vec![1, 2, 0], "backend {name}");
        assert!(history.iter().all(|m| m.processed), "backend {name}");
    }
}

// ---------------------------------------------------------------------------
// 2. Recent returns newest first and honours the limit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn recent_newest_first() {
    for (name, store) in backends() {
        let base = Utc::now();
        for i in 0..5 {
            let mut m = Message::new("a", "b", "t", json!({"n": i}), None);
            m.timestamp = base + Duration::seconds(i);
            store.insert_message(&m).await.unwrap();
        }
        let recent = store.recent_messages(2).await.unwrap();
        let order: Vec<i64> = recent
            .iter()
            .map(|m| m.content["n"].as_i64().unwrap())
            .collect();
        assert_eq!(order, vec![4, 3], "backend {name}");
        assert!(store.recent_messages(0).await.unwrap().is_empty(), "backend {name}");
    }
}

// ---------------------------------------------------------------------------
// 3. Claims filter by disruption and sender
// ---------------------------------------------------------------------------

#[tokio::test]
async fn claim_respects_filters() {
    for (name, store) in backends() {
        let inputs = [
            ("passenger_rebooking", Some(7)),
            ("airport_resource", Some(7)),
            ("airport_resource", Some(8)),
        ];
        for (sender, disruption) in inputs {
            let m = Message::new(sender, "customer_communication", "t", json!({}), disruption);
            store.insert_message(&m).await.unwrap();
        }

        let q = MessageQuery::pending_for("customer_communication")
            .with_disruption(Some(7))
            .with_sender(Some("airport_resource".into()));
        let claimed = store.claim_messages(&q).await.unwrap();
        assert_eq!(claimed.len(), 1, "backend {name}");
        assert_eq!(claimed[0].sender, "airport_resource");

        // The other two remain pending.
        let rest = store
            .claim_messages(&MessageQuery::pending_for("customer_communication"))
            .await
            .unwrap();
        assert_eq!(rest.len(), 2, "backend {name}");
    }
}

// ---------------------------------------------------------------------------
// 4. Concurrent claims never hand out the same message twice
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_claims_are_disjoint() {
    for (name, store) in backends() {
        for i in 0..20 {
            let m = Message::new("a", "b", "t", json!({"n": i}), None);
            store.insert_message(&m).await.unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .claim_messages(&MessageQuery::pending_for("b"))
                    .await
                    .unwrap()
            }));
        }
        let mut total = 0;
        for h in handles {
            total += h.await.unwrap().len();
        }
        assert_eq!(total, 20, "backend {name}");
    }
}

// ---------------------------------------------------------------------------
// 5. mark_processed is idempotent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mark_processed_idempotent() {
    for (name, store) in backends() {
        let m = Message::new("a", "b", "t", json!({}), None);
        store.insert_message(&m).await.unwrap();
        assert!(store.mark_processed(m.id).await.unwrap(), "backend {name}");
        assert!(store.mark_processed(m.id).await.unwrap(), "backend {name}");
        let pending = store
            .query_messages(&MessageQuery::pending_for("b"))
            .await
            .unwrap();
        assert!(pending.is_empty(), "backend {name}");
    }
}

// ---------------------------------------------------------------------------
// 6. SQLite data survives reopening the file
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sqlite_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("irops.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        let flight = Flight::new("IR1", "IR1", "JFK", "BOS", Utc::now()).with_passengers(120);
        store.put_flight(&flight).await.unwrap();
        let d = Disruption::new(5, DisruptionKind::Weather, Severity::Medium).with_flights(["IR1"]);
        store.put_disruption(&d).await.unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    let d = store.get_disruption(5).await.unwrap().unwrap();
    let flights = store.get_flights(&d.affected_flights).await.unwrap();
    assert_eq!(flights.len(), 1);
    assert_eq!(flights[0].passenger_count, 120);
    assert_eq!(store.list_flights().await.unwrap().len(), 1);
}
