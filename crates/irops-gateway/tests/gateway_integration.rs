#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::Utc;
use irops_agent::backends::canned::StaticRecommender;
use irops_core::{Disruption, DisruptionKind, Flight, Message, Severity};
use irops_gateway::GatewayServer;
use irops_orchestrator::{Coordinator, CoordinatorConfig};
use irops_store::{MemoryStore, Store};
use serde_json::{json, Value};
use tokio::net::TcpListener;

async fn seed(store: &dyn Store) {
    let t0 = Utc::now() + chrono::Duration::hours(2);
    let flights = [
        Flight::new("IR300", "IR300", "ORD", "DEN", t0)
            .with_aircraft("A321-N300")
            .with_crew(["C7"])
            .with_passengers(180)
            .with_delay(200),
        Flight::new("IR301", "IR301", "ORD", "DEN", t0 + chrono::Duration::hours(4))
            .with_aircraft("A321-N301"),
    ];
    for f in &flights {
        store.put_flight(f).await.unwrap();
    }
    let disruption = Disruption::new(1, DisruptionKind::Weather, Severity::High)
        .with_flights(["IR300"])
        .with_airports(["ORD"])
        .with_description("Thunderstorms over Chicago");
    store.put_disruption(&disruption).await.unwrap();
}

/// Helper: build a seeded test server on a random port.
async fn start_test_server() -> (String, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    seed(store.as_ref()).await;

    let coordinator = Coordinator::airline(
        store.clone(),
        Arc::new(StaticRecommender::new("Use reserve crews.")),
        CoordinatorConfig::default(),
    )
    .await
    .unwrap();
    let app = GatewayServer::build(Arc::new(coordinator));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let addr_str = format!("127.0.0.1:{}", addr.port());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Small yield to let the server task start
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    (addr_str, store)
}

async fn get_json(url: String) -> (u16, Value) {
    let resp = reqwest::get(url).await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn post_json(url: String) -> (u16, Value) {
    let resp = reqwest::Client::new().post(url).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

// ---------------------------------------------------------------------------
// 1. Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_endpoint() {
    let (addr, _store) = start_test_server().await;
    let (status, body) = get_json(format!("http://{addr}/health")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "irops");
}

// ---------------------------------------------------------------------------
// 2. Coordination
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_coordinate_returns_report() {
    let (addr, _store) = start_test_server().await;
    let (status, body) = post_json(format!("http://{addr}/api/coordinate/1")).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["disruption_id"], 1);
    assert_eq!(body["agents_involved"], 5);
    assert_eq!(
        body["coordination_phases"],
        json!(["Assessment", "Planning", "Execution", "Monitoring"])
    );
    assert_eq!(body["execution_results"].as_object().unwrap().len(), 5);
    assert_eq!(
        body["coordination_plan"]["priority_sequence"]
            .as_array()
            .unwrap()
            .len(),
        5
    );
}

#[tokio::test]
async fn test_coordinate_unknown_disruption() {
    let (addr, store) = start_test_server().await;
    let (status, body) = post_json(format!("http://{addr}/api/coordinate/42")).await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Disruption 42 not found");
    assert_eq!(store.message_count().await, 0);
}

// ---------------------------------------------------------------------------
// 3. Worker status and reset
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_agent_status_and_reset() {
    let (addr, _store) = start_test_server().await;

    let (_, before) = get_json(format!("http://{addr}/api/agent_status")).await;
    let workers = before.as_object().unwrap();
    assert_eq!(workers.len(), 5);
    assert!(workers.values().all(|w| w["status"] == "idle"));

    post_json(format!("http://{addr}/api/coordinate/1")).await;
    let (_, after) = get_json(format!("http://{addr}/api/agent_status")).await;
    assert!(after
        .as_object()
        .unwrap()
        .values()
        .all(|w| w["status"] == "active"));

    let (status, body) = post_json(format!("http://{addr}/api/reset_agents")).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "All agents have been reset successfully");

    let (_, reset) = get_json(format!("http://{addr}/api/agent_status")).await;
    assert!(reset
        .as_object()
        .unwrap()
        .values()
        .all(|w| w["status"] == "idle" && w["current_task"].is_null()));
}

// ---------------------------------------------------------------------------
// 4. Disruptions and communications
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_disruptions_listing() {
    let (addr, _store) = start_test_server().await;
    let (status, body) = get_json(format!("http://{addr}/api/disruptions")).await;
    assert_eq!(status, 200);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], 1);
    assert_eq!(list[0]["description"], "Thunderstorms over Chicago");
}

#[tokio::test]
async fn test_communications_history_newest_first() {
    let (addr, _store) = start_test_server().await;
    post_json(format!("http://{addr}/api/coordinate/1")).await;

    let (status, body) = get_json(format!("http://{addr}/api/communications/1")).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    let comms = body["communications"].as_array().unwrap();
    assert!(!comms.is_empty());
    assert!(comms.len() <= 20);
    assert_eq!(comms[0]["message_type"], "coordination_complete");
    assert_eq!(comms[0]["sender"], "coordinator");

    let (_, empty) = get_json(format!("http://{addr}/api/communications/99")).await;
    assert!(empty["communications"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_recent_communications_limit() {
    let (addr, _store) = start_test_server().await;
    post_json(format!("http://{addr}/api/coordinate/1")).await;

    let (status, body) =
        get_json(format!("http://{addr}/api/communications/recent?limit=3")).await;
    assert_eq!(status, 200);
    assert_eq!(body["communications"].as_array().unwrap().len(), 3);

    let (_, default) = get_json(format!("http://{addr}/api/communications/recent")).await;
    assert!(default["communications"].as_array().unwrap().len() <= 10);
}

// ---------------------------------------------------------------------------
// 5. Mailbox processing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_process_agent_messages() {
    let (addr, store) = start_test_server().await;
    store
        .insert_message(&Message::new(
            "system",
            "crew_scheduling",
            "status_request",
            json!({}),
            None,
        ))
        .await
        .unwrap();

    let url = format!("http://{addr}/api/agents/crew_scheduling/messages");
    let (status, body) = post_json(url.clone()).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["worker"], "crew_scheduling");
    let processed = body["processed"].as_array().unwrap();
    assert_eq!(processed.len(), 1);
    assert_eq!(processed[0]["message_type"], "status_request");
    assert_eq!(processed[0]["response"]["name"], "crew_scheduling");

    // Read-once: a second drain finds nothing.
    let (_, again) = post_json(url).await;
    assert!(again["processed"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_process_messages_unknown_worker() {
    let (addr, _store) = start_test_server().await;
    let (status, body) = post_json(format!("http://{addr}/api/agents/ghost/messages")).await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
}
