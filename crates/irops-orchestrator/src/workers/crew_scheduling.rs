use crate::types::{Recommendation, RecommendationPriority};
use crate::worker::{missing_analysis, missing_outcome, number_at, text_at, Worker, WorkerDeps};
use async_trait::async_trait;
use irops_core::{Disruption, Flight, IropsResult, JobId};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use tracing::info;

pub const NAME: &str = "crew_scheduling";

/// Duty-time compliance and reserve crew substitution.
pub struct CrewSchedulingWorker {
    deps: WorkerDeps,
}

impl CrewSchedulingWorker {
    pub fn new(deps: WorkerDeps) -> Self {
        Self { deps }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DutyViolation {
    pub flight: String,
    pub crew_id: String,
    pub violation_type: &'static str,
    pub estimated_duty_time: &'static str,
    pub action_required: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReserveCrew {
    pub crew_id: String,
    pub base: String,
    pub qualification: &'static str,
    pub availability: &'static str,
}

fn unique_crews(flights: &[Flight]) -> BTreeSet<&str> {
    flights
        .iter()
        .flat_map(|f| f.crew_ids.iter().map(String::as_str))
        .collect()
}

fn origins(flights: &[Flight]) -> BTreeSet<&str> {
    flights.iter().map(|f| f.origin.as_str()).collect()
}

/// Flights delayed past two hours put their lead crew over duty limits.
pub fn duty_violations(flights: &[Flight]) -> Vec<DutyViolation> {
    flights
        .iter()
        .filter(|f| f.delay() > 120)
        .map(|f| DutyViolation {
            flight: f.flight_number.clone(),
            crew_id: f
                .crew_ids
                .first()
                .cloned()
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            violation_type: "potential_overtime",
            estimated_duty_time: "14+ hours",
            action_required: "crew_substitution",
        })
        .collect()
}

/// Three reserves per origin airport.
pub fn reserve_crews(flights: &[Flight]) -> Vec<ReserveCrew> {
    origins(flights)
        .into_iter()
        .flat_map(|airport| {
            (1..=3).map(move |i| ReserveCrew {
                crew_id: format!("RESERVE_{airport}_{i}"),
                base: airport.to_string(),
                qualification: "A320/A321",
                availability: "immediate",
            })
        })
        .collect()
}

/// Pairs violations with reserves in order; extra violations go unassigned.
pub fn reassignment_plan(violations: &[DutyViolation], reserves: &[ReserveCrew]) -> Value {
    let assignments: Vec<Value> = violations
        .iter()
        .zip(reserves)
        .map(|(v, r)| {
            json!({
                "original_crew": v.crew_id,
                "replacement_crew": r.crew_id,
                "flight": v.flight,
                "status": "assigned",
            })
        })
        .collect();
    json!({
        "immediate_actions": [
            "Replace crews with duty time violations",
            "Position reserve crews to affected airports",
            "Coordinate with crew scheduling office"
        ],
        "crew_assignments": assignments,
        "timeline": {
            "0-30min": "Assess all crew statuses",
            "30-60min": "Execute crew substitutions",
            "60-120min": "Position crews for next wave"
        },
        "resources_required": {
            "reserve_crews": violations.len(),
            "positioning_flights": reserves.len(),
            "crew_schedulers": 3
        }
    })
}

fn crew_impact(flights: &[Flight]) -> Value {
    let total = unique_crews(flights).len();
    json!({
        "total_crews": total,
        "crew_types": {
            "pilots": total / 2,
            "flight_attendants": total - total / 2,
        },
        "crew_bases": origins(flights),
    })
}

/// Delays over an hour mark a crew as high risk.
pub fn duty_time_risk(flights: &[Flight]) -> Value {
    let high = flights.iter().filter(|f| f.delay() > 60).count();
    json!({
        "high_risk_crews": high,
        "moderate_risk_crews": flights.len() - high,
        "risk_factors": ["Extended delays", "Multiple sectors", "Late night operations"],
    })
}

fn recommendations_prompt(disruption: &Disruption, flights: &[Flight], maintenance: &Value) -> String {
    let duration = match (disruption.start_time, disruption.estimated_end_time) {
        (Some(start), Some(end)) => format!("{} minutes", (end - start).num_minutes()),
        _ => "Unknown".to_string(),
    };
    format!(
        "As an airline crew scheduling specialist, analyze this crew disruption:\n\n\
         Disruption: {} - {}\nAffected Flights: {}\nCrews Affected: {}\n\
         Disruption Duration: {duration}\nDescription: {}\n\
         Maintenance Status: {}\nMaintenance ETA: {}\n\n\
         Provide solutions for:\n\
         1. Optimal crew reassignment strategy\n\
         2. Duty time compliance approach\n\
         3. Reserve crew utilization\n\
         4. Crew positioning optimization\n\
         5. Cost-effective recovery plan\n\n\
         Consider regulatory constraints and crew rest requirements.\n\
         Format as actionable recommendations.",
        disruption.kind,
        disruption.severity,
        flights.len(),
        unique_crews(flights).len(),
        disruption.description,
        text_at(maintenance, "/status", "Unknown"),
        text_at(maintenance, "/estimated_completion_time", "N/A"),
    )
}

#[async_trait]
impl Worker for CrewSchedulingWorker {
    fn name(&self) -> &str {
        NAME
    }

    fn display_name(&self) -> &str {
        "Crew Scheduling Agent"
    }

    fn capabilities(&self) -> &[&'static str] {
        &[
            "duty_time_monitoring",
            "crew_optimization",
            "reserve_crew_management",
            "crew_positioning",
            "regulatory_compliance",
        ]
    }

    async fn analyze_situation(&self, disruption_id: JobId) -> IropsResult<Value> {
        let Some((_, flights)) = self.deps.load(disruption_id).await? else {
            return Ok(missing_analysis(disruption_id));
        };
        let crews = unique_crews(&flights).len().max(1);
        let airports = origins(&flights).len();
        Ok(json!({
            "crew_utilization": {
                "flights_per_crew": flights.len() as f64 / crews as f64,
                "average_duty_day": "11.5 hours",
                "utilization_rate": "85%"
            },
            "duty_time_risk": duty_time_risk(&flights),
            "crew_availability": {
                "reserve_utilization": 75,
                "available_reserves": 12,
                "on_call_crews": 8,
                "positioning_availability": "Good"
            },
            "positioning_requirements": {
                "crews_to_position": airports * 2,
                "positioning_flights_needed": airports,
                "estimated_positioning_time": "2-4 hours"
            },
            "regulatory_constraints": [
                "FAR Part 117 duty time limits",
                "Required rest periods between duties",
                "Maximum flight duty period restrictions",
                "Crew qualification requirements"
            ],
        }))
    }

    async fn process_disruption(&self, disruption_id: JobId) -> IropsResult<Value> {
        let Some((disruption, flights)) = self.deps.load(disruption_id).await? else {
            return Ok(missing_outcome(disruption_id));
        };

        let maintenance_context = self
            .deps
            .mailbox
            .context_from(NAME, disruption_id, super::aircraft_maintenance::NAME)
            .await;

        let impact = crew_impact(&flights);
        let violations = duty_violations(&flights);
        let reserves = reserve_crews(&flights);
        let ai_recommendations = self
            .deps
            .advise(
                "ai_recommendations",
                &recommendations_prompt(&disruption, &flights, &maintenance_context),
            )
            .await;

        let outcome = json!({
            "success": true,
            "agent": self.display_name(),
            "disruption_id": disruption_id,
            "flights_affected": flights.len(),
            "crews_affected": impact["total_crews"],
            "crew_impact": impact,
            "duty_violations": violations.len(),
            "available_reserves": reserves.len(),
            "reassignment_plan": reassignment_plan(&violations, &reserves),
            "ai_recommendations": ai_recommendations,
            "maintenance_context": maintenance_context,
        });

        self.deps
            .mailbox
            .send(
                NAME,
                super::aircraft_maintenance::NAME,
                "crew_coordination",
                json!({
                    "disruption_id": disruption_id,
                    "crew_changes": violations.len(),
                    "ready_for_coordination": true,
                }),
                Some(disruption_id),
            )
            .await;

        info!(disruption_id, violations = violations.len(), reserves = reserves.len(), "Crew plan ready");
        Ok(outcome)
    }

    fn generate_recommendations(&self, analysis: &Value) -> Vec<Recommendation> {
        let mut recs = Vec::new();
        let high_risk = number_at(analysis, "/duty_time_risk/high_risk_crews");
        if high_risk > 0.0 {
            recs.push(Recommendation::new(
                RecommendationPriority::Critical,
                "Immediate crew substitution required",
                format!("{high_risk} crews approaching duty limits"),
            ));
        }
        if number_at(analysis, "/crew_availability/reserve_utilization") > 80.0 {
            recs.push(Recommendation::new(
                RecommendationPriority::High,
                "Activate standby crews from other bases",
                "Reserve crew capacity near exhaustion",
            ));
        }
        if number_at(analysis, "/positioning_requirements/crews_to_position") > 0.0 {
            recs.push(Recommendation::new(
                RecommendationPriority::Medium,
                "Coordinate crew positioning flights",
                "Crews need repositioning for optimal coverage",
            ));
        }
        recs.push(Recommendation::new(
            RecommendationPriority::Medium,
            "Monitor duty time compliance continuously",
            "Prevent regulatory violations during recovery",
        ));
        recs
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn flight(id: &str, origin: &str, delay: u32, crew: &[&str]) -> Flight {
        Flight::new(id, format!("IR{id}"), origin, "LAX", Utc::now())
            .with_crew(crew.iter().copied())
            .with_delay(delay)
    }

    #[test]
    fn test_violations_use_lead_crew() {
        let flights = vec![
            flight("1", "JFK", 121, &["C1", "C2"]),
            flight("2", "JFK", 120, &["C3"]),
            flight("3", "BOS", 300, &[]),
        ];
        let v = duty_violations(&flights);
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].crew_id, "C1");
        assert_eq!(v[1].crew_id, "UNKNOWN");
    }

    #[test]
    fn test_three_reserves_per_origin() {
        let flights = vec![flight("1", "JFK", 0, &[]), flight("2", "BOS", 0, &[])];
        let reserves = reserve_crews(&flights);
        assert_eq!(reserves.len(), 6);
        assert_eq!(reserves[0].crew_id, "RESERVE_BOS_1");
    }

    #[test]
    fn test_reassignment_pairs_violations_with_reserves() {
        let flights = vec![flight("1", "JFK", 200, &["C1"]), flight("2", "JFK", 200, &["C2"])];
        let plan = reassignment_plan(&duty_violations(&flights), &reserve_crews(&flights));
        let assignments = plan["crew_assignments"].as_array().unwrap();
        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[0]["original_crew"], "C1");
        assert_eq!(assignments[0]["replacement_crew"], "RESERVE_JFK_1");
        assert_eq!(plan["resources_required"]["reserve_crews"], 2);
    }

    #[test]
    fn test_duty_time_risk_split() {
        let flights = vec![flight("1", "JFK", 61, &[]), flight("2", "JFK", 60, &[])];
        let risk = duty_time_risk(&flights);
        assert_eq!(risk["high_risk_crews"], 1);
        assert_eq!(risk["moderate_risk_crews"], 1);
    }
}
