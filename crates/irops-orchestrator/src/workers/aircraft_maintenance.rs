use crate::types::{Recommendation, RecommendationPriority};
use crate::worker::{missing_analysis, missing_outcome, number_at, text_at, Worker, WorkerDeps};
use async_trait::async_trait;
use irops_core::{Disruption, DisruptionKind, Flight, IropsResult, JobId, Severity};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

pub const NAME: &str = "aircraft_maintenance";

/// Technical triage, spare aircraft, and hangar coordination.
pub struct AircraftMaintenanceWorker {
    deps: WorkerDeps,
}

impl AircraftMaintenanceWorker {
    pub fn new(deps: WorkerDeps) -> Self {
        Self { deps }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceNeed {
    pub aircraft_id: String,
    pub maintenance_type: &'static str,
    pub urgency: &'static str,
    pub estimated_hours: u32,
    pub description: &'static str,
    pub technicians_required: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpareAircraft {
    pub aircraft_id: String,
    pub aircraft_type: String,
    pub location: &'static str,
    pub status: &'static str,
}

fn affected_aircraft(flights: &[Flight]) -> BTreeSet<&str> {
    flights.iter().filter_map(|f| f.aircraft_id.as_deref()).collect()
}

pub fn maintenance_urgency(disruption: &Disruption) -> &'static str {
    if disruption.kind == DisruptionKind::Mechanical {
        "critical"
    } else if disruption.severity.is_severe() {
        "high"
    } else {
        "medium"
    }
}

pub fn technical_complexity(disruption: &Disruption) -> &'static str {
    match (disruption.kind, disruption.severity) {
        (DisruptionKind::Mechanical, Severity::Critical) => "high",
        (DisruptionKind::Mechanical, _) => "medium",
        _ => "low",
    }
}

fn maintenance_impact(kind: DisruptionKind) -> &'static str {
    match kind {
        DisruptionKind::Mechanical => "High - Immediate maintenance required",
        DisruptionKind::Weather => "Medium - Inspection required",
        DisruptionKind::Airport => "Low - Possible inspection needed",
        DisruptionKind::Crew | DisruptionKind::Traffic => "Low - No maintenance impact",
    }
}

/// Mechanical: one unscheduled repair per aircraft. Weather: an inspection
/// for each aircraft whose flight is delayed more than 180 minutes.
pub fn maintenance_needs(disruption: &Disruption, flights: &[Flight]) -> Vec<MaintenanceNeed> {
    let mut seen = BTreeSet::new();
    let mut needs = Vec::new();
    for flight in flights {
        let Some(aircraft_id) = flight.aircraft_id.as_deref() else {
            continue;
        };
        let need = match disruption.kind {
            DisruptionKind::Mechanical => MaintenanceNeed {
                aircraft_id: aircraft_id.to_string(),
                maintenance_type: "unscheduled",
                urgency: "critical",
                estimated_hours: 8,
                description: "Mechanical issue investigation and repair",
                technicians_required: 3,
            },
            DisruptionKind::Weather if flight.delay() > 180 => MaintenanceNeed {
                aircraft_id: aircraft_id.to_string(),
                maintenance_type: "inspection",
                urgency: "medium",
                estimated_hours: 2,
                description: "Post-weather event inspection",
                technicians_required: 1,
            },
            _ => continue,
        };
        if seen.insert(aircraft_id) {
            needs.push(need);
        }
    }
    needs
}

/// Two spares per affected aircraft type.
pub fn spare_aircraft(flights: &[Flight]) -> Vec<SpareAircraft> {
    let types: BTreeSet<&str> = flights.iter().filter_map(Flight::aircraft_type).collect();
    types
        .into_iter()
        .flat_map(|t| {
            (1..=2).map(move |i| SpareAircraft {
                aircraft_id: format!("{t}-SPARE{i}"),
                aircraft_type: t.to_string(),
                location: "Maintenance Base",
                status: "ready",
            })
        })
        .collect()
}

pub fn estimated_recovery_time(needs: &[MaintenanceNeed]) -> String {
    match needs.iter().map(|n| n.estimated_hours).max() {
        Some(hours) => format!("{hours} hours"),
        None => "No maintenance required".to_string(),
    }
}

fn recovery_plan(needs: &[MaintenanceNeed], spares: &[SpareAircraft]) -> Value {
    let sequence: Vec<Value> = needs
        .iter()
        .enumerate()
        .map(|(i, need)| {
            json!({
                "priority": i + 1,
                "aircraft_id": need.aircraft_id,
                "task": need.description,
                "estimated_completion": format!("{} hours", need.estimated_hours),
                "assigned_team": format!("Team {}", i + 1),
            })
        })
        .collect();
    json!({
        "immediate_actions": [
            "Assess all aircraft technical status",
            "Deploy maintenance teams to affected aircraft",
            "Coordinate spare aircraft positioning"
        ],
        "maintenance_sequence": sequence,
        "resource_allocation": {
            "technicians_deployed": needs.iter().map(|n| n.technicians_required).sum::<u32>(),
            "spare_aircraft_activated": spares.len(),
            "hangar_bays_required": needs.len().min(4),
        },
        "timeline": {
            "0-1hr": "Initial assessment and team deployment",
            "1-4hr": "Critical repairs and inspections",
            "4-8hr": "Complete repairs and aircraft return to service"
        }
    })
}

fn solutions_prompt(disruption: &Disruption, aircraft_count: usize, tasks: usize) -> String {
    format!(
        "As an aircraft maintenance specialist, analyze this maintenance disruption:\n\n\
         Disruption Type: {}\nSeverity: {}\nAircraft Affected: {aircraft_count}\nMaintenance Tasks: {tasks}\n\n\
         Provide solutions for:\n\
         1. Optimal maintenance task prioritization\n\
         2. Resource allocation strategy\n\
         3. Parts procurement approach\n\
         4. Spare aircraft utilization\n\
         5. Schedule recovery optimization\n\n\
         Consider airworthiness requirements and operational constraints.\n\
         Format as actionable maintenance recommendations.",
        disruption.kind, disruption.severity
    )
}

#[async_trait]
impl Worker for AircraftMaintenanceWorker {
    fn name(&self) -> &str {
        NAME
    }

    fn display_name(&self) -> &str {
        "Aircraft Maintenance Agent"
    }

    fn capabilities(&self) -> &[&'static str] {
        &[
            "maintenance_scheduling",
            "aircraft_availability",
            "technical_troubleshooting",
            "spare_parts_management",
            "airworthiness_compliance",
        ]
    }

    async fn analyze_situation(&self, disruption_id: JobId) -> IropsResult<Value> {
        let Some((disruption, flights)) = self.deps.load(disruption_id).await? else {
            return Ok(missing_analysis(disruption_id));
        };
        let out_of_service = affected_aircraft(&flights).len();
        Ok(json!({
            "fleet_impact": {
                "aircraft_out_of_service": out_of_service,
                "fleet_utilization_impact": format!("{}%", out_of_service * 2),
                "recovery_priority": if out_of_service > 3 { "High" } else { "Medium" },
            },
            "maintenance_urgency": maintenance_urgency(&disruption),
            "resource_availability": {
                "technicians_available": 12,
                "hangar_capacity": 6,
                "parts_inventory": "Adequate",
                "equipment_availability": "Full"
            },
            "spare_aircraft_status": {
                "total_spares": 8,
                "immediately_available": 5,
                "available_within_24h": 3,
                "spare_utilization": "65%"
            },
            "technical_complexity": technical_complexity(&disruption),
        }))
    }

    async fn process_disruption(&self, disruption_id: JobId) -> IropsResult<Value> {
        let Some((disruption, flights)) = self.deps.load(disruption_id).await? else {
            return Ok(missing_outcome(disruption_id));
        };

        let aircraft = affected_aircraft(&flights);
        let mut aircraft_types: BTreeMap<&str, u32> = BTreeMap::new();
        for t in flights.iter().filter_map(Flight::aircraft_type) {
            *aircraft_types.entry(t).or_default() += 1;
        }
        let needs = maintenance_needs(&disruption, &flights);
        let spares = spare_aircraft(&flights);

        let ai_solutions = self
            .deps
            .advise(
                "ai_solutions",
                &solutions_prompt(&disruption, aircraft.len(), needs.len()),
            )
            .await;

        let outcome = json!({
            "success": true,
            "agent": self.display_name(),
            "disruption_id": disruption_id,
            "aircraft_affected": aircraft.len(),
            "aircraft_types": aircraft_types,
            "maintenance_impact": maintenance_impact(disruption.kind),
            "maintenance_required": needs.len(),
            "maintenance_needs": needs,
            "spare_aircraft_available": spares.len(),
            "spare_aircraft": spares,
            "recovery_plan": recovery_plan(&needs, &spares),
            "ai_solutions": ai_solutions,
            "estimated_recovery_time": estimated_recovery_time(&needs),
            "airworthiness_status": "Compliant",
        });

        self.deps
            .mailbox
            .send(
                NAME,
                super::airport_resource::NAME,
                "maintenance_coordination",
                json!({
                    "disruption_id": disruption_id,
                    "hangar_space_needed": needs.len(),
                    "ground_support_required": true,
                }),
                Some(disruption_id),
            )
            .await;

        info!(disruption_id, aircraft = aircraft.len(), tasks = needs.len(), "Maintenance plan ready");
        Ok(outcome)
    }

    fn generate_recommendations(&self, analysis: &Value) -> Vec<Recommendation> {
        let mut recs = Vec::new();
        if text_at(analysis, "/maintenance_urgency", "low") == "critical" {
            recs.push(Recommendation::new(
                RecommendationPriority::Critical,
                "Deploy emergency maintenance teams immediately",
                "Critical maintenance issues require immediate attention",
            ));
        }
        if number_at(analysis, "/fleet_impact/aircraft_out_of_service") > 2.0 {
            recs.push(Recommendation::new(
                RecommendationPriority::High,
                "Activate spare aircraft from reserves",
                "Multiple aircraft unavailable - utilize backup fleet",
            ));
        }
        if text_at(analysis, "/technical_complexity", "low") == "high" {
            recs.push(Recommendation::new(
                RecommendationPriority::Medium,
                "Coordinate with OEM technical support",
                "Complex technical issues may require manufacturer expertise",
            ));
        }
        recs.push(Recommendation::new(
            RecommendationPriority::Medium,
            "Monitor parts inventory for expedited ordering",
            "Ensure spare parts availability for rapid repairs",
        ));
        recs
    }
}
