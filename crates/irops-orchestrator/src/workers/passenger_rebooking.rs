use crate::types::{Recommendation, RecommendationPriority};
use crate::worker::{missing_analysis, missing_outcome, number_at, text_at, Worker, WorkerDeps};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use irops_core::{total_passengers, Disruption, Flight, FlightStatus, IropsResult, JobId};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

pub const NAME: &str = "passenger_rebooking";

const MAX_ALTERNATIVES_PER_FLIGHT: usize = 5;

const PRIORITY_CATEGORIES: [&str; 5] = [
    "Elite status members",
    "Unaccompanied minors",
    "Passengers with special needs",
    "Tight connections",
    "Medical emergencies",
];

/// Alternative flight search and passenger prioritization.
pub struct PassengerRebookingWorker {
    deps: WorkerDeps,
}

impl PassengerRebookingWorker {
    pub fn new(deps: WorkerDeps) -> Self {
        Self { deps }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlternativeFlight {
    pub original_flight: String,
    pub alternative_flight: String,
    pub departure_time: DateTime<Utc>,
    pub delay_from_original: i64,
}

/// Same-route scheduled flights departing within 24 hours after each
/// affected flight, at most five per flight, earliest first.
pub fn find_alternatives(affected: &[Flight], candidates: &[Flight]) -> Vec<AlternativeFlight> {
    let mut alternatives = Vec::new();
    for flight in affected {
        let window_end = flight.scheduled_departure + Duration::hours(24);
        let mut options: Vec<&Flight> = candidates
            .iter()
            .filter(|c| {
                c.id != flight.id
                    && c.status == FlightStatus::Scheduled
                    && c.origin == flight.origin
                    && c.destination == flight.destination
                    && c.scheduled_departure >= flight.scheduled_departure
                    && c.scheduled_departure <= window_end
            })
            .collect();
        options.sort_by_key(|c| c.scheduled_departure);
        alternatives.extend(options.into_iter().take(MAX_ALTERNATIVES_PER_FLIGHT).map(|alt| {
            AlternativeFlight {
                original_flight: flight.flight_number.clone(),
                alternative_flight: alt.flight_number.clone(),
                departure_time: alt.scheduled_departure,
                delay_from_original: (alt.scheduled_departure - flight.scheduled_departure)
                    .num_minutes(),
            }
        }));
    }
    alternatives
}

/// Thirty percent of each flight's passengers, rounded down per flight.
pub fn connecting_passengers(flights: &[Flight]) -> u64 {
    flights
        .iter()
        .map(|f| u64::from(f.passenger_count) * 3 / 10)
        .sum()
}

pub fn rebooking_complexity(total_passengers: u64) -> &'static str {
    if total_passengers > 500 {
        "high"
    } else if total_passengers > 200 {
        "medium"
    } else {
        "low"
    }
}

/// Flights already past their scheduled departure are urgent.
pub fn time_sensitivity(flights: &[Flight], now: DateTime<Utc>) -> &'static str {
    let urgent = flights.iter().filter(|f| f.scheduled_departure <= now).count();
    if urgent * 2 > flights.len() {
        "critical"
    } else if urgent > 0 {
        "high"
    } else {
        "medium"
    }
}

fn rebooking_plan() -> Value {
    json!({
        "phases": [
            {
                "phase": "Priority Passengers",
                "duration": "30 minutes",
                "actions": ["Process elite status passengers", "Handle special needs passengers"]
            },
            {
                "phase": "Connecting Passengers",
                "duration": "60 minutes",
                "actions": ["Rebook tight connections", "Coordinate with hub operations"]
            },
            {
                "phase": "General Passengers",
                "duration": "120 minutes",
                "actions": ["Process remaining passengers", "Offer accommodation if needed"]
            }
        ],
        "resources_needed": {
            "staff": 8,
            "workstations": 6,
            "phone_lines": 12
        },
        "estimated_completion": "3-4 hours"
    })
}

fn analysis_prompt(
    disruption: &Disruption,
    flights: &[Flight],
    alternatives: usize,
    crew: &Value,
) -> String {
    let crews_reassigned = crew
        .get("crews_reassigned")
        .map_or_else(|| "N/A".to_string(), Value::to_string);
    format!(
        "As an airline passenger rebooking specialist, analyze this disruption situation:\n\n\
         Disruption: {} - {}\nDescription: {}\nAffected Flights: {}\nTotal Passengers: {}\n\
         Available Alternatives: {alternatives}\nCrew Availability Status: {}\n\
         Crews Reassigned: {crews_reassigned}\n\n\
         Provide recommendations for:\n\
         1. Passenger prioritization strategy\n\
         2. Rebooking sequence optimization\n\
         3. Customer communication approach\n\
         4. Compensation considerations\n\n\
         Format as JSON with clear actionable recommendations.",
        disruption.kind,
        disruption.severity,
        disruption.description,
        flights.len(),
        total_passengers(flights),
        text_at(crew, "/status", "Unknown"),
    )
}

#[async_trait]
impl Worker for PassengerRebookingWorker {
    fn name(&self) -> &str {
        NAME
    }

    fn display_name(&self) -> &str {
        "Passenger Rebooking Agent"
    }

    fn capabilities(&self) -> &[&'static str] {
        &[
            "alternative_flight_search",
            "passenger_accommodation",
            "rebooking_optimization",
            "passenger_prioritization",
            "cost_analysis",
        ]
    }

    async fn analyze_situation(&self, disruption_id: JobId) -> IropsResult<Value> {
        let Some((_, flights)) = self.deps.load(disruption_id).await? else {
            return Ok(missing_analysis(disruption_id));
        };
        let total = total_passengers(&flights);
        Ok(json!({
            "passenger_impact": {
                "total_affected": total,
                "connecting_passengers": connecting_passengers(&flights),
                "priority_passengers": PRIORITY_CATEGORIES.len(),
            },
            "rebooking_complexity": rebooking_complexity(total),
            "time_sensitivity": time_sensitivity(&flights, Utc::now()),
            "available_capacity": {
                "same_day_availability": "Limited",
                "next_day_availability": "Good",
                "partner_airline_options": "Available"
            },
        }))
    }

    async fn process_disruption(&self, disruption_id: JobId) -> IropsResult<Value> {
        let Some((disruption, flights)) = self.deps.load(disruption_id).await? else {
            return Ok(missing_outcome(disruption_id));
        };

        let crew_context = self
            .deps
            .mailbox
            .context_from(NAME, disruption_id, super::crew_scheduling::NAME)
            .await;

        let total = total_passengers(&flights);
        let candidates = self.deps.store.list_flights().await?;
        let alternatives = find_alternatives(&flights, &candidates);
        let ai_recommendations = self
            .deps
            .advise(
                "ai_analysis",
                &analysis_prompt(&disruption, &flights, alternatives.len(), &crew_context),
            )
            .await;

        let outcome = json!({
            "success": true,
            "agent": self.display_name(),
            "disruption_id": disruption_id,
            "passengers_affected": total,
            "flights_affected": flights.len(),
            "alternatives_found": alternatives.len(),
            "alternatives": alternatives,
            "rebooking_plan": rebooking_plan(),
            "ai_recommendations": ai_recommendations,
            "estimated_rebooking_time": "2-4 hours",
            "priority_passengers": PRIORITY_CATEGORIES,
            "crew_context": crew_context,
        });

        self.deps
            .mailbox
            .send(
                NAME,
                super::customer_communication::NAME,
                "passenger_update",
                json!({
                    "disruption_id": disruption_id,
                    "passengers_affected": total,
                    "rebooking_status": "in_progress",
                }),
                Some(disruption_id),
            )
            .await;

        info!(disruption_id, passengers = total, alternatives = alternatives.len(), "Rebooking plan ready");
        Ok(outcome)
    }

    fn generate_recommendations(&self, analysis: &Value) -> Vec<Recommendation> {
        let mut recs = Vec::new();
        if number_at(analysis, "/passenger_impact/total_affected") > 100.0 {
            recs.push(Recommendation::new(
                RecommendationPriority::High,
                "Activate emergency rebooking protocols",
                "Large number of passengers affected",
            ));
        }
        if text_at(analysis, "/rebooking_complexity", "low") == "high" {
            recs.push(Recommendation::new(
                RecommendationPriority::Medium,
                "Request additional rebooking staff",
                "Complex rebooking scenarios require extra resources",
            ));
        }
        if text_at(analysis, "/time_sensitivity", "medium") == "critical" {
            recs.push(Recommendation::new(
                RecommendationPriority::Critical,
                "Prioritize same-day rebooking options",
                "Time-critical passengers need immediate alternatives",
            ));
        }
        recs.push(Recommendation::new(
            RecommendationPriority::Medium,
            "Coordinate with partner airlines for additional capacity",
            "Maximize rebooking options",
        ));
        recs
    }
}
