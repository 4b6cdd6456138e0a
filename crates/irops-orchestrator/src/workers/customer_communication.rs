use crate::types::{Recommendation, RecommendationPriority};
use crate::worker::{missing_analysis, missing_outcome, text_at, Worker, WorkerDeps};
use async_trait::async_trait;
use irops_core::{total_passengers, Disruption, DisruptionKind, Flight, IropsResult, JobId, Severity};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

pub const NAME: &str = "customer_communication";

/// Passenger notifications, sentiment risk, and compensation exposure.
pub struct CustomerCommunicationWorker {
    deps: WorkerDeps,
}

impl CustomerCommunicationWorker {
    pub fn new(deps: WorkerDeps) -> Self {
        Self { deps }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompensationExposure {
    pub risk_level: &'static str,
    pub estimated_cost: u64,
    pub affected_passengers: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompensationAssessment {
    pub compensation_eligible: bool,
    pub compensation_type: &'static str,
    pub estimated_cost: u64,
    pub eligibility_criteria: Vec<&'static str>,
}

fn significant_delays(flights: &[Flight]) -> u64 {
    flights.iter().filter(|f| f.delay() > 180).count() as u64
}

pub fn communication_urgency(disruption: &Disruption, flights: &[Flight]) -> &'static str {
    if disruption.severity == Severity::Critical {
        "critical"
    } else if flights.len() > 10 || total_passengers(flights) > 1000 {
        "high"
    } else {
        "medium"
    }
}

pub fn sentiment_risk(disruption: &Disruption, flights: &[Flight]) -> &'static str {
    let mut score = 0;
    if disruption.kind.is_airline_controllable() {
        score += 2;
    }
    if disruption.severity.is_severe() {
        score += 2;
    }
    if flights.iter().any(|f| f.delay() > 240) {
        score += 2;
    }
    if flights.len() > 15 {
        score += 1;
    }
    match score {
        s if s >= 4 => "high",
        s if s >= 2 => "medium",
        _ => "low",
    }
}

fn message_complexity(kind: DisruptionKind) -> &'static str {
    match kind {
        DisruptionKind::Weather => "low",
        k if k.is_airline_controllable() => "high",
        _ => "medium",
    }
}

fn channel_requirements(total: u64) -> Value {
    let secondary: &[&str] = if total > 500 {
        &["Social Media", "Website"]
    } else {
        &["Website"]
    };
    json!({
        "multi_channel_required": total > 200,
        "social_media_needed": total > 500,
        "priority_channels": ["SMS", "Email", "App"],
        "secondary_channels": secondary,
    })
}

pub fn compensation_exposure(disruption: &Disruption, flights: &[Flight]) -> CompensationExposure {
    let total = total_passengers(flights);
    let significant = significant_delays(flights);
    if significant > 5 && disruption.kind.is_airline_controllable() {
        CompensationExposure {
            risk_level: "high",
            estimated_cost: total * 200,
            affected_passengers: total,
        }
    } else if significant > 0 {
        CompensationExposure {
            risk_level: "medium",
            estimated_cost: total * 75,
            affected_passengers: total,
        }
    } else {
        CompensationExposure {
            risk_level: "low",
            estimated_cost: 0,
            affected_passengers: 0,
        }
    }
}

pub fn compensation_assessment(disruption: &Disruption, flights: &[Flight]) -> CompensationAssessment {
    let significant = significant_delays(flights);
    if significant == 0 {
        return CompensationAssessment {
            compensation_eligible: false,
            compensation_type: "none",
            estimated_cost: 0,
            eligibility_criteria: Vec::new(),
        };
    }
    if disruption.kind.is_airline_controllable() {
        CompensationAssessment {
            compensation_eligible: true,
            compensation_type: "monetary_voucher",
            estimated_cost: significant * 250,
            eligibility_criteria: vec![
                "Delay exceeds 3 hours",
                "Cause within airline control",
                "Domestic/international flight regulations apply",
            ],
        }
    } else {
        CompensationAssessment {
            compensation_eligible: true,
            compensation_type: "service_recovery",
            estimated_cost: significant * 50,
            eligibility_criteria: vec![
                "Meal vouchers for extended delays",
                "Hotel accommodation if overnight",
                "Transportation allowances",
            ],
        }
    }
}

fn passenger_impact(flights: &[Flight]) -> Value {
    let total = total_passengers(flights);
    json!({
        "total_passengers": total,
        "passenger_categories": {
            "business_travelers": total * 4 / 10,
            "leisure_travelers": total * 5 / 10,
            "connecting_passengers": total * 3 / 10,
            "international_passengers": total * 2 / 10,
        },
        "high_value_customers": total * 15 / 100,
        "special_assistance_required": total * 5 / 100,
    })
}

fn communication_plan(ai_drafts: &Value) -> Value {
    json!({
        "approach": "proactive_multi_channel",
        "channels": [
            {"channel": "SMS", "priority": 1, "reach": "100%"},
            {"channel": "Email", "priority": 2, "reach": "90%"},
            {"channel": "Mobile App", "priority": 3, "reach": "60%"},
            {"channel": "Airport Announcements", "priority": 4, "reach": "30%"}
        ],
        "messaging_timeline": {
            "immediate": "Initial disruption notification",
            "15_minutes": "Detailed situation update with options",
            "30_minutes": "Rebooking and compensation information",
            "hourly": "Progress updates until resolution"
        },
        "tone": "empathetic_professional",
        "key_messages": [
            "We apologize for the inconvenience",
            "We are working to resolve this situation",
            "Alternative options are being arranged",
            "Compensation will be provided as appropriate"
        ],
        "ai_drafts": ai_drafts,
    })
}

/// One alert per flight for the first five flights, plus a general notice
/// when more than one flight is affected.
pub fn passenger_notifications(disruption: &Disruption, flights: &[Flight]) -> Vec<Value> {
    let urgency = if disruption.severity.is_severe() { "high" } else { "medium" };
    let mut notifications: Vec<Value> = flights
        .iter()
        .take(5)
        .map(|f| {
            json!({
                "flight_number": f.flight_number,
                "notification_type": "disruption_alert",
                "channels": ["SMS", "Email", "App"],
                "message": format!("Important update for {}: {}", f.flight_number, disruption.description),
                "action_required": "Please check rebooking options",
                "urgency": urgency,
                "estimated_passengers": f.passenger_count,
            })
        })
        .collect();
    if flights.len() > 1 {
        notifications.push(json!({
            "flight_number": "Multiple flights",
            "notification_type": "general_disruption",
            "channels": ["Email", "App", "Website"],
            "message": format!("Service disruption affecting multiple flights: {}", disruption.description),
            "action_required": "Check flight status and rebooking options",
            "urgency": disruption.severity,
            "estimated_passengers": total_passengers(flights),
        }));
    }
    notifications
}

fn drafts_prompt(disruption: &Disruption, total: u64, rebooking: &Value, airport: &Value) -> String {
    format!(
        "As an airline customer communications specialist, analyze this disruption situation:\n\n\
         Disruption: {} - {}\nDescription: {}\nTotal Passengers Affected: {total}\n\
         Rebooking Status: {}\nAirport Facility Status: {}\n\n\
         Generate:\n\
         1. AI-powered communication drafts for different channels\n\
         2. Relevant context from other agents\n\
         3. Recommendations for communication strategy\n\n\
         Tone should be professional, empathetic, and solution-focused.\n\
         Include clear actions passengers can take.",
        disruption.kind,
        disruption.severity,
        disruption.description,
        text_at(rebooking, "/rebooking_status", "Pending"),
        text_at(airport, "/status", "Operational"),
    )
}

fn content_prompt(disruption: &Disruption, impact: &Value) -> String {
    format!(
        "As an airline customer service specialist, create passenger communication content for this disruption:\n\n\
         Disruption: {} - {}\nDescription: {}\nPassengers Affected: {}\n\
         Business Travelers: {}\nConnecting Passengers: {}\n\n\
         Generate:\n\
         1. Empathetic initial notification message (SMS/Email)\n\
         2. Detailed explanation with next steps (Email/App)\n\
         3. Social media statement (if needed)\n\
         4. Airport announcement script\n\
         5. FAQ responses for common passenger questions\n\n\
         Tone should be professional, empathetic, and solution-focused.\n\
         Include clear actions passengers can take.",
        disruption.kind,
        disruption.severity,
        disruption.description,
        impact["total_passengers"],
        impact["passenger_categories"]["business_travelers"],
        impact["passenger_categories"]["connecting_passengers"],
    )
}

#[async_trait]
impl Worker for CustomerCommunicationWorker {
    fn name(&self) -> &str {
        NAME
    }

    fn display_name(&self) -> &str {
        "Customer Communication Agent"
    }

    fn capabilities(&self) -> &[&'static str] {
        &[
            "passenger_notifications",
            "multi_channel_communication",
            "sentiment_analysis",
            "proactive_messaging",
            "compensation_coordination",
        ]
    }

    async fn analyze_situation(&self, disruption_id: JobId) -> IropsResult<Value> {
        let Some((disruption, flights)) = self.deps.load(disruption_id).await? else {
            return Ok(missing_analysis(disruption_id));
        };
        Ok(json!({
            "communication_urgency": communication_urgency(&disruption, &flights),
            "passenger_sentiment_risk": sentiment_risk(&disruption, &flights),
            "channel_requirements": channel_requirements(total_passengers(&flights)),
            "message_complexity": message_complexity(disruption.kind),
            "compensation_exposure": compensation_exposure(&disruption, &flights),
        }))
    }

    async fn process_disruption(&self, disruption_id: JobId) -> IropsResult<Value> {
        let Some((disruption, flights)) = self.deps.load(disruption_id).await? else {
            return Ok(missing_outcome(disruption_id));
        };

        let mailbox = &self.deps.mailbox;
        let rebooking_context = mailbox
            .context_from(NAME, disruption_id, super::passenger_rebooking::NAME)
            .await;
        let airport_context = mailbox
            .context_from(NAME, disruption_id, super::airport_resource::NAME)
            .await;

        let impact = passenger_impact(&flights);
        let total = total_passengers(&flights);
        let ai_drafts = self
            .deps
            .advise(
                "ai_drafts",
                &drafts_prompt(&disruption, total, &rebooking_context, &airport_context),
            )
            .await;
        let plan = communication_plan(&ai_drafts);
        let ai_content = self
            .deps
            .advise("ai_content", &content_prompt(&disruption, &impact))
            .await;
        let channels = plan["channels"].as_array().map_or(0, Vec::len);

        let outcome = json!({
            "success": true,
            "agent": self.display_name(),
            "disruption_id": disruption_id,
            "passengers_to_notify": total,
            "passenger_impact": impact,
            "communication_channels": channels,
            "communications_sent": 0,
            "communication_plan": plan,
            "passenger_notifications": passenger_notifications(&disruption, &flights),
            "ai_drafts": ai_drafts,
            "rebooking_context": rebooking_context,
            "airport_context": airport_context,
            "ai_content": ai_content,
            "compensation_assessment": compensation_assessment(&disruption, &flights),
            "estimated_response_time": "15 minutes",
        });

        info!(disruption_id, passengers = total, "Communication initiated");
        Ok(outcome)
    }

    fn generate_recommendations(&self, analysis: &Value) -> Vec<Recommendation> {
        let mut recs = Vec::new();
        if text_at(analysis, "/communication_urgency", "medium") == "critical" {
            recs.push(Recommendation::new(
                RecommendationPriority::Critical,
                "Send immediate proactive notifications to all affected passengers",
                "High-impact disruption requires immediate passenger awareness",
            ));
        }
        if text_at(analysis, "/passenger_sentiment_risk", "medium") == "high" {
            recs.push(Recommendation::new(
                RecommendationPriority::High,
                "Deploy empathetic messaging with clear action steps",
                "High sentiment risk requires careful communication approach",
            ));
        }
        let multi_channel = analysis
            .pointer("/channel_requirements/multi_channel_required")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if multi_channel {
            recs.push(Recommendation::new(
                RecommendationPriority::Medium,
                "Activate all communication channels (SMS, email, app, social)",
                "Broad passenger base requires multi-channel approach",
            ));
        }
        if text_at(analysis, "/compensation_exposure/risk_level", "low") == "high" {
            recs.push(Recommendation::new(
                RecommendationPriority::Medium,
                "Prepare compensation processing and clear policy communication",
                "Significant compensation exposure requires proactive management",
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
    fn test_urgency() {
        let critical = Disruption::new(1, DisruptionKind::Weather, Severity::Critical);
        assert_eq!(communication_urgency(&critical, &flights(1, 10, 0)), "critical");
        let medium = Disruption::new(2, DisruptionKind::Weather, Severity::Medium);
        assert_eq!(communication_urgency(&medium, &flights(11, 10, 0)), "high");
        assert_eq!(communication_urgency(&medium, &flights(2, 600, 0)), "high");
        assert_eq!(communication_urgency(&medium, &flights(2, 10, 0)), "medium");
    }

    #[test]
    fn test_sentiment_scoring() {
        let mech = Disruption::new(1, DisruptionKind::Mechanical, Severity::High);
        assert_eq!(sentiment_risk(&mech, &flights(1, 10, 0)), "high");
        let weather = Disruption::new(2, DisruptionKind::Weather, Severity::Low);
        assert_eq!(sentiment_risk(&weather, &flights(1, 10, 241)), "medium");
        assert_eq!(sentiment_risk(&weather, &flights(16, 10, 0)), "low");
    }

    #[test]
    fn test_compensation_exposure_levels() {
        let mech = Disruption::new(1, DisruptionKind::Mechanical, Severity::High);
        let high = compensation_exposure(&mech, &flights(6, 100, 200));
        assert_eq!(high.risk_level, "high");
        assert_eq!(high.estimated_cost, 600 * 200);

        let weather = Disruption::new(2, DisruptionKind::Weather, Severity::High);
        let medium = compensation_exposure(&weather, &flights(6, 100, 200));
        assert_eq!(medium.risk_level, "medium");
        assert_eq!(medium.estimated_cost, 600 * 75);

        let low = compensation_exposure(&weather, &flights(6, 100, 100));
        assert_eq!(low.risk_level, "low");
        assert_eq!(low.affected_passengers, 0);
    }

    #[test]
    fn test_compensation_assessment_per_flight() {
        let crew = Disruption::new(1, DisruptionKind::Crew, Severity::Medium);
        let a = compensation_assessment(&crew, &flights(3, 100, 200));
        assert_eq!(a.compensation_type, "monetary_voucher");
        assert_eq!(a.estimated_cost, 750);

        let airport = Disruption::new(2, DisruptionKind::Airport, Severity::Medium);
        let b = compensation_assessment(&airport, &flights(3, 100, 200));
        assert_eq!(b.compensation_type, "service_recovery");
        assert_eq!(b.estimated_cost, 150);

        let none = compensation_assessment(&airport, &flights(3, 100, 10));
        assert!(!none.compensation_eligible);
    }

    #[test]
    fn test_notifications_cap_and_general_notice() {
        let d = Disruption::new(1, DisruptionKind::Weather, Severity::High).with_description("Storm");
        let notes = passenger_notifications(&d, &flights(7, 10, 0));
        assert_eq!(notes.len(), 6);
        assert_eq!(notes[0]["urgency"], "high");
        assert_eq!(notes[5]["estimated_passengers"], 70);
        assert_eq!(passenger_notifications(&d, &flights(1, 10, 0)).len(), 1);
    }
}
