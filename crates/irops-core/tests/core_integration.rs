#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{Duration, Utc};
use irops_core::*;

// ---------------------------------------------------------------------------
// 1. Disruption fixture JSON parses with defaults
// ---------------------------------------------------------------------------

#[test]
fn disruption_fixture_parses() {
    let raw = r#"{
        "id": 101,
        "kind": "mechanical",
        "severity": "critical",
        "description": "Engine indication fault",
        "affected_flights": ["IR100", "IR200"],
        "affected_airports": ["JFK", "BOS"]
    }"#;
    let d: Disruption = serde_json::from_str(raw).unwrap();
    assert_eq!(d.id, 101);
    assert_eq!(d.kind, DisruptionKind::Mechanical);
    assert_eq!(d.severity, Severity::Critical);
    assert_eq!(d.affected_flights.len(), 2);
    assert_eq!(d.status, DisruptionStatus::Active);
}

// ---------------------------------------------------------------------------
// 2. Flight roundtrip keeps optional fields
// ---------------------------------------------------------------------------

#[test]
fn flight_serialization_roundtrip() {
    let departure = Utc::now() + Duration::hours(2);
    let flight = Flight::new("IR100", "IR100", "JFK", "LAX", departure)
        .with_aircraft("B737-N900")
        .with_crew(["C1", "C2"])
        .with_passengers(180)
        .with_delay(45);

    let json = serde_json::to_string(&flight).unwrap();
    let back: Flight = serde_json::from_str(&json).unwrap();

    assert_eq!(back.id, "IR100");
    assert_eq!(back.scheduled_departure, departure);
    assert_eq!(back.aircraft_type(), Some("B737"));
    assert_eq!(back.crew_ids, vec!["C1".to_string(), "C2".to_string()]);
    assert_eq!(back.status, FlightStatus::Delayed);
    assert_eq!(back.delay(), 45);
}

// ---------------------------------------------------------------------------
// 3. Error Display
// ---------------------------------------------------------------------------

#[test]
fn error_display() {
    let timeout = IropsError::WorkerTimeout("crew_scheduling".to_string());
    assert_eq!(timeout.to_string(), "Worker timeout: crew_scheduling");

    let ext = IropsError::ExternalService("quota exceeded".to_string());
    assert_eq!(ext.to_string(), "External service error: quota exceeded");

    let storage = IropsError::Storage("disk full".to_string());
    assert_eq!(storage.to_string(), "Storage error: disk full");

    let io: IropsError = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
    assert!(io.to_string().starts_with("IO error"));
}

// ---------------------------------------------------------------------------
// 4. Message content stays opaque JSON
// ---------------------------------------------------------------------------

#[test]
fn message_content_is_opaque_json() {
    let content = serde_json::json!({"nested": {"list": [1, 2, 3]}, "flag": true});
    let msg = Message::new("coordinator", "system", "coordination_complete", content.clone(), Some(5));
    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["content"], content);
    assert_eq!(json["processed"], false);
    assert_eq!(json["disruption_id"], 5);
}
