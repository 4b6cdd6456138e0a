use crate::types::{Recommendation, RecommendationPriority};
use crate::worker::{missing_analysis, missing_outcome, number_at, text_at, Worker, WorkerDeps};
use async_trait::async_trait;
use irops_core::{total_passengers, Disruption, Flight, IropsResult, JobId};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::info;

pub const NAME: &str = "airport_resource";

/// Gates, ground equipment, terminal flow, and baggage handling.
pub struct AirportResourceWorker {
    deps: WorkerDeps,
}

impl AirportResourceWorker {
    pub fn new(deps: WorkerDeps) -> Self {
        Self { deps }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceAnalysis {
    pub gates_needed: usize,
    pub ground_equipment_demand: Value,
    pub passenger_processing_load: u64,
    pub baggage_handling_impact: Value,
    pub service_impacts: Vec<&'static str>,
}

pub fn resource_analysis(flights: &[Flight]) -> ResourceAnalysis {
    let n = flights.len();
    let pax = total_passengers(flights);
    let mut service_impacts = Vec::new();
    if n > 10 {
        service_impacts.push("High passenger volume - expect longer wait times");
    }
    if flights.iter().any(|f| f.delay() > 120) {
        service_impacts.push("Extended delays - passenger services required");
    }
    ResourceAnalysis {
        gates_needed: n,
        ground_equipment_demand: json!({
            "pushback_tugs": n,
            "belt_loaders": n * 2,
            "catering_trucks": n,
            "fuel_trucks": (n / 2).max(1),
            "ground_power_units": n,
        }),
        passenger_processing_load: pax,
        baggage_handling_impact: json!({
            "estimated_bags": pax as f64 * 1.5,
            "additional_screening_time": "30 minutes",
            "baggage_claim_impact": "Extended wait times expected",
            "staffing_increase_needed": (pax / 100).max(2),
        }),
        service_impacts,
    }
}

/// Reassigns the first five flights; past ten flights the overflow uses
/// remote stands.
pub fn gate_requirements(flights: &[Flight]) -> Value {
    let reassignments: Vec<Value> = flights
        .iter()
        .take(5)
        .enumerate()
        .map(|(i, f)| {
            json!({
                "flight_number": f.flight_number,
                "original_gate": format!("{}-{}", f.origin, 10 + i),
                "new_gate": format!("{}-{}", f.origin, 20 + i),
                "reason": "Disruption accommodation",
            })
        })
        .collect();
    json!({
        "total_gates_needed": flights.len(),
        "gate_reassignments": reassignments,
        "remote_stand_usage": flights.len().saturating_sub(10),
        "gate_conflicts": [],
    })
}

/// 60 minutes base, plus 30 for more than ten gates, 30 for more than a
/// thousand passengers, and 15 per service impact.
pub fn estimated_resolution_time(analysis: &ResourceAnalysis) -> String {
    let mut minutes = 60;
    if analysis.gates_needed > 10 {
        minutes += 30;
    }
    if analysis.passenger_processing_load > 1000 {
        minutes += 30;
    }
    minutes += 15 * analysis.service_impacts.len();
    format!("{minutes} minutes")
}

pub fn operational_bottlenecks(flights: &[Flight], airports: &[String]) -> Vec<&'static str> {
    let mut bottlenecks = Vec::new();
    if flights.len() > 15 {
        bottlenecks.push("gate_availability");
    }
    if total_passengers(flights) > 1000 {
        bottlenecks.extend(["security_checkpoint", "baggage_handling"]);
    }
    if airports.len() > 3 {
        bottlenecks.push("coordination_complexity");
    }
    bottlenecks
}

fn per_airport(airports: &[String], entry: impl Fn() -> Value) -> Value {
    let map: Map<String, Value> = airports.iter().map(|a| (a.clone(), entry())).collect();
    Value::Object(map)
}

fn resource_availability(airports: &[String]) -> Value {
    per_airport(airports, || {
        json!({
            "gates_available": 8,
            "remote_stands": 12,
            "ground_equipment": {
                "pushback_tugs": 6,
                "belt_loaders": 8,
                "catering_trucks": 4,
                "fuel_trucks": 3
            },
            "personnel": {
                "ground_handlers": 15,
                "customer_service": 8,
                "baggage_handlers": 12
            },
            "terminal_capacity": "Normal"
        })
    })
}

fn allocation_plan(flights: &[Flight], airports: &[String], analysis: &ResourceAnalysis) -> Value {
    let gate_assignments: Vec<Value> = flights
        .iter()
        .take(10)
        .enumerate()
        .map(|(i, f)| {
            json!({
                "flight": f.flight_number,
                "gate": format!("Gate {}", i + 1),
                "equipment_assigned": ["Pushback tug", "Belt loader", "Ground power"],
                "service_level": "Full service",
            })
        })
        .collect();
    let passenger_services: Vec<&str> = if analysis.passenger_processing_load > 500 {
        vec![
            "Mobile check-in assistance",
            "Additional customer service desks",
            "Refreshment stations for delayed passengers",
            "Enhanced boarding announcements",
        ]
    } else {
        Vec::new()
    };
    json!({
        "gate_assignments": gate_assignments,
        "equipment_deployment": per_airport(airports, || json!({
            "additional_tugs": 2,
            "extra_belt_loaders": 3,
            "backup_ground_power": 2,
            "catering_support": 1
        })),
        "staffing_adjustments": per_airport(airports, || json!({
            "additional_ground_crew": 5,
            "extra_customer_service": 3,
            "baggage_handling_boost": 4,
            "shift_extensions": "2 hours"
        })),
        "passenger_services": passenger_services,
        "timeline": {
            "immediate": "Secure gates and deploy basic equipment",
            "30min": "Complete equipment positioning and staff briefing",
            "60min": "Full service restoration with passenger accommodation"
        }
    })
}

fn solutions_prompt(disruption: &Disruption, analysis: &ResourceAnalysis) -> String {
    format!(
        "As an airport operations specialist, analyze this resource disruption:\n\n\
         Disruption: {} - {}\nAirports Affected: {}\nGates Needed: {}\nPassenger Load: {}\n\n\
         Provide solutions for:\n\
         1. Optimal gate allocation strategy\n\
         2. Ground equipment deployment\n\
         3. Passenger flow management\n\
         4. Terminal operations coordination\n\
         5. Service level maintenance\n\n\
         Consider operational constraints and passenger experience.\n\
         Format as actionable resource management recommendations.",
        disruption.kind,
        disruption.severity,
        disruption.affected_airports.len(),
        analysis.gates_needed,
        analysis.passenger_processing_load,
    )
}

#[async_trait]
impl Worker for AirportResourceWorker {
    fn name(&self) -> &str {
        NAME
    }

    fn display_name(&self) -> &str {
        "Airport Resource Agent"
    }

    fn capabilities(&self) -> &[&'static str] {
        &[
            "gate_management",
            "ground_equipment_coordination",
            "terminal_operations",
            "baggage_handling",
            "security_coordination",
        ]
    }

    async fn analyze_situation(&self, disruption_id: JobId) -> IropsResult<Value> {
        let Some((disruption, flights)) = self.deps.load(disruption_id).await? else {
            return Ok(missing_analysis(disruption_id));
        };
        let airports = &disruption.affected_airports;
        let pax = total_passengers(&flights);
        Ok(json!({
            "capacity_impact": {
                "congestion_level": if airports.len() > 2 { "high" } else { "medium" },
                "gate_utilization": "85%",
                "runway_impact": "Minimal",
                "terminal_impact": "Moderate"
            },
            "resource_strain": {
                "ground_equipment_utilization": 85,
                "staffing_utilization": 90,
                "gate_utilization": 80,
                "critical_resources": ["Ground crew", "Customer service staff"]
            },
            "operational_bottlenecks": operational_bottlenecks(&flights, airports),
            "passenger_flow_impact": {
                "terminal_congestion": if pax > 800 { "high" } else { "medium" },
                "check_in_impact": "Extended wait times",
                "security_impact": "Possible delays",
                "boarding_impact": "Gate congestion likely"
            },
            "equipment_availability": per_airport(airports, || json!({
                "operational_equipment": "95%",
                "backup_availability": "Good",
                "maintenance_status": "Normal",
                "critical_spares": "Available"
            })),
        }))
    }

    async fn process_disruption(&self, disruption_id: JobId) -> IropsResult<Value> {
        let Some((disruption, flights)) = self.deps.load(disruption_id).await? else {
            return Ok(missing_outcome(disruption_id));
        };
        let airports = &disruption.affected_airports;

        let analysis = resource_analysis(&flights);
        let gates = gate_requirements(&flights);
        let ai_solutions = self
            .deps
            .advise("ai_solutions", &solutions_prompt(&disruption, &analysis))
            .await;
        let gate_changes = gates["gate_reassignments"].as_array().map_or(0, Vec::len);

        let outcome = json!({
            "success": true,
            "agent": self.display_name(),
            "disruption_id": disruption_id,
            "airports_affected": airports.len(),
            "flights_requiring_resources": flights.len(),
            "resource_analysis": analysis,
            "resource_availability": resource_availability(airports),
            "gate_requirements": gates,
            "allocation_plan": allocation_plan(&flights, airports, &analysis),
            "ai_solutions": ai_solutions,
            "estimated_resolution_time": estimated_resolution_time(&analysis),
        });

        self.deps
            .mailbox
            .send(
                NAME,
                super::customer_communication::NAME,
                "resource_update",
                json!({
                    "disruption_id": disruption_id,
                    "gate_changes": gate_changes,
                    "service_impacts": analysis.service_impacts,
                }),
                Some(disruption_id),
            )
            .await;

        info!(disruption_id, airports = airports.len(), gate_changes, "Resource allocation ready");
        Ok(outcome)
    }

    fn generate_recommendations(&self, analysis: &Value) -> Vec<Recommendation> {
        let mut recs = Vec::new();
        if text_at(analysis, "/capacity_impact/congestion_level", "low") == "high" {
            recs.push(Recommendation::new(
                RecommendationPriority::Critical,
                "Activate overflow gate areas and remote stands",
                "High airport congestion requires additional capacity",
            ));
        }
        if number_at(analysis, "/resource_strain/ground_equipment_utilization") > 90.0 {
            recs.push(Recommendation::new(
                RecommendationPriority::High,
                "Deploy backup ground support equipment",
                "Ground equipment at capacity - risk of service delays",
            ));
        }
        let baggage_bottleneck = analysis
            .get("operational_bottlenecks")
            .and_then(Value::as_array)
            .is_some_and(|b| b.iter().any(|v| v == "baggage_handling"));
        if baggage_bottleneck {
            recs.push(Recommendation::new(
                RecommendationPriority::Medium,
                "Increase baggage handling staff and equipment",
                "Baggage system bottleneck identified",
            ));
        }
        if text_at(analysis, "/passenger_flow_impact/terminal_congestion", "normal") == "high" {
            recs.push(Recommendation::new(
                RecommendationPriority::Medium,
                "Implement crowd control measures in terminals",
                "High passenger volume requires flow management",
            ));
        }
        recs
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn flights(n: usize, pax: u32, delay: u32) -> Vec<Flight> {
        (0..n)
            .map(|i| {
                Flight::new(format!("F{i}"), format!("IR{i}"), "JFK", "LAX", Utc::now())
                    .with_passengers(pax)
                    .with_delay(delay)
            })
            .collect()
    }

    #[test]
    fn test_resolution_time_accumulates() {
        let quiet = resource_analysis(&flights(2, 100, 30));
        assert!(quiet.service_impacts.is_empty());
        assert_eq!(estimated_resolution_time(&quiet), "60 minutes");

        let busy = resource_analysis(&flights(12, 100, 150));
        assert_eq!(busy.service_impacts.len(), 2);
        assert_eq!(busy.passenger_processing_load, 1200);
        assert_eq!(estimated_resolution_time(&busy), "150 minutes");
    }

    #[test]
    fn test_gate_requirements_cap_and_remote_stands() {
        let gates = gate_requirements(&flights(12, 0, 0));
        assert_eq!(gates["gate_reassignments"].as_array().unwrap().len(), 5);
        assert_eq!(gates["gate_reassignments"][0]["new_gate"], "JFK-20");
        assert_eq!(gates["remote_stand_usage"], 2);
        assert_eq!(gate_requirements(&flights(3, 0, 0))["remote_stand_usage"], 0);
    }

    #[test]
    fn test_bottlenecks() {
        let airports: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
        let b = operational_bottlenecks(&flights(16, 100, 0), &airports);
        assert_eq!(
            b,
            vec!["gate_availability", "security_checkpoint", "baggage_handling", "coordination_complexity"]
        );
        assert!(operational_bottlenecks(&flights(1, 10, 0), &[]).is_empty());
    }

    #[test]
    fn test_baggage_staffing_floor() {
        let a = resource_analysis(&flights(1, 50, 0));
        assert_eq!(a.baggage_handling_impact["staffing_increase_needed"], 2);
        assert_eq!(a.baggage_handling_impact["estimated_bags"], 75.0);
    }
}
