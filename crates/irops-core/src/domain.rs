use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Application-level disruption identifier.
pub type JobId = i64;

/// Application-level flight identifier.
pub type FlightId = String;

/// Root cause category of a disruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisruptionKind {
    Weather,
    Mechanical,
    Crew,
    Airport,
    Traffic,
}

impl DisruptionKind {
    /// Causes the airline is accountable for (drives compensation and tone).
    pub fn is_airline_controllable(&self) -> bool {
        matches!(self, DisruptionKind::Mechanical | DisruptionKind::Crew)
    }
}

impl std::fmt::Display for DisruptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisruptionKind::Weather => write!(f, "weather"),
            DisruptionKind::Mechanical => write!(f, "mechanical"),
            DisruptionKind::Crew => write!(f, "crew"),
            DisruptionKind::Airport => write!(f, "airport"),
            DisruptionKind::Traffic => write!(f, "traffic"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// High or critical.
    pub fn is_severe(&self) -> bool {
        *self >= Severity::High
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisruptionStatus {
    #[default]
    Active,
    Resolved,
}

/// An operational disruption: the unit of work the coordinator processes.
///
/// Created externally (fixtures, seed data) and never mutated by the
/// coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disruption {
    pub id: JobId,
    pub kind: DisruptionKind,
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub affected_flights: Vec<FlightId>,
    #[serde(default)]
    pub affected_airports: Vec<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimated_end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: DisruptionStatus,
}

impl Disruption {
    pub fn new(id: JobId, kind: DisruptionKind, severity: Severity) -> Self {
        Self {
            id,
            kind,
            severity,
            description: String::new(),
            affected_flights: Vec::new(),
            affected_airports: Vec::new(),
            start_time: None,
            estimated_end_time: None,
            status: DisruptionStatus::Active,
        }
    }

    pub fn with_flights<I, S>(mut self, flights: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FlightId>,
    {
        self.affected_flights = flights.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_airports<I, S>(mut self, airports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_airports = airports.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightStatus {
    #[default]
    Scheduled,
    Delayed,
    Cancelled,
    Departed,
}

/// A flight referenced by a disruption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub id: FlightId,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub scheduled_departure: DateTime<Utc>,
    #[serde(default)]
    pub aircraft_id: Option<String>,
    #[serde(default)]
    pub crew_ids: Vec<String>,
    #[serde(default)]
    pub passenger_count: u32,
    #[serde(default)]
    pub status: FlightStatus,
    #[serde(default)]
    pub delay_minutes: Option<u32>,
}

impl Flight {
    pub fn new(
        id: impl Into<FlightId>,
        flight_number: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
        scheduled_departure: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            flight_number: flight_number.into(),
            origin: origin.into(),
            destination: destination.into(),
            scheduled_departure,
            aircraft_id: None,
            crew_ids: Vec::new(),
            passenger_count: 0,
            status: FlightStatus::Scheduled,
            delay_minutes: None,
        }
    }

    pub fn with_aircraft(mut self, aircraft_id: impl Into<String>) -> Self {
        self.aircraft_id = Some(aircraft_id.into());
        self
    }

    pub fn with_crew<I, S>(mut self, crew: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.crew_ids = crew.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_passengers(mut self, count: u32) -> Self {
        self.passenger_count = count;
        self
    }

    pub fn with_delay(mut self, minutes: u32) -> Self {
        self.delay_minutes = Some(minutes);
        self.status = FlightStatus::Delayed;
        self
    }

    /// Delay in minutes, zero when unknown.
    pub fn delay(&self) -> u32 {
        self.delay_minutes.unwrap_or(0)
    }

    /// Aircraft type prefix, e.g. `A320` for `A320-N123`.
    pub fn aircraft_type(&self) -> Option<&str> {
        self.aircraft_id
            .as_deref()
            .and_then(|id| id.split('-').next())
            .filter(|t| !t.is_empty())
    }
}

/// Lifecycle status of a worker.
///
/// `Idle → Processing` on task start, then `Active` on success or `Error` on
/// failure. `Error` is recovered by the next successful task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    #[default]
    Idle,
    Active,
    Processing,
    Error,
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerStatus::Idle => write!(f, "idle"),
            WorkerStatus::Active => write!(f, "active"),
            WorkerStatus::Processing => write!(f, "processing"),
            WorkerStatus::Error => write!(f, "error"),
        }
    }
}

/// Persisted view of a worker, mirrored into the `workers` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub name: String,
    pub display_name: String,
    pub status: WorkerStatus,
    pub capabilities: Vec<String>,
    pub current_task: Option<String>,
    pub last_activity: DateTime<Utc>,
}

/// Total passengers across a set of flights.
pub fn total_passengers(flights: &[Flight]) -> u64 {
    flights.iter().map(|f| u64::from(f.passenger_count)).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn flight(id: &str) -> Flight {
        Flight::new(id, format!("IR{id}"), "JFK", "LAX", Utc::now())
    }

    #[test]
    fn test_disruption_builder() {
        let d = Disruption::new(7, DisruptionKind::Mechanical, Severity::High)
            .with_flights(["A", "B"])
            .with_airports(["JFK"])
            .with_description("Hydraulic leak");
        assert_eq!(d.affected_flights, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(d.affected_airports.len(), 1);
        assert_eq!(d.status, DisruptionStatus::Active);
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&DisruptionKind::Mechanical).unwrap();
        assert_eq!(json, "\"mechanical\"");
        assert!(DisruptionKind::Crew.is_airline_controllable());
        assert!(!DisruptionKind::Weather.is_airline_controllable());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical.is_severe());
        assert!(Severity::High.is_severe());
        assert!(!Severity::Medium.is_severe());
    }

    #[test]
    fn test_aircraft_type() {
        let f = flight("1").with_aircraft("A320-N123");
        assert_eq!(f.aircraft_type(), Some("A320"));
        assert_eq!(flight("2").aircraft_type(), None);
    }

    #[test]
    fn test_delay_marks_flight_delayed() {
        let f = flight("1").with_delay(90);
        assert_eq!(f.delay(), 90);
        assert_eq!(f.status, FlightStatus::Delayed);
        assert_eq!(flight("2").delay(), 0);
    }

    #[test]
    fn test_total_passengers() {
        let flights = vec![flight("1").with_passengers(150), flight("2").with_passengers(30)];
        assert_eq!(total_passengers(&flights), 180);
    }

    #[test]
    fn test_disruption_defaults_on_deserialize() {
        let d: Disruption =
            serde_json::from_str(r#"{"id": 3, "kind": "weather", "severity": "low"}"#).unwrap();
        assert!(d.affected_flights.is_empty());
        assert!(d.start_time.is_none());
    }
}
