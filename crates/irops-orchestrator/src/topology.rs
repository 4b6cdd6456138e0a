use crate::priority::PriorityPolicy;
use crate::types::FlowEdge;
use crate::workers::{
    aircraft_maintenance, airport_resource, crew_scheduling, customer_communication,
    passenger_rebooking,
};
use irops_core::{IropsError, IropsResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Static coordination tables: ordering policy, advisory dependencies,
/// post-execution routing, and monitoring criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub priority: PriorityPolicy,
    /// Workers expected to finish before the key runs. Unmet entries only
    /// produce a warning.
    pub dependencies: BTreeMap<String, Vec<String>>,
    pub communication_flow: Vec<FlowEdge>,
    pub success_criteria: BTreeMap<String, String>,
    /// Message types acknowledged when a worker drains its mailbox.
    pub coordination_types: BTreeSet<String>,
}

fn deps(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

impl Topology {
    pub fn airline() -> Self {
        let dependencies = BTreeMap::from([
            (
                passenger_rebooking::NAME.to_string(),
                deps(&[crew_scheduling::NAME, aircraft_maintenance::NAME]),
            ),
            (
                customer_communication::NAME.to_string(),
                deps(&[passenger_rebooking::NAME, airport_resource::NAME]),
            ),
            (
                airport_resource::NAME.to_string(),
                deps(&[aircraft_maintenance::NAME]),
            ),
            (crew_scheduling::NAME.to_string(), Vec::new()),
            (aircraft_maintenance::NAME.to_string(), Vec::new()),
        ]);

        let communication_flow = vec![
            FlowEdge::new(aircraft_maintenance::NAME, crew_scheduling::NAME, "maintenance_status"),
            FlowEdge::new(crew_scheduling::NAME, passenger_rebooking::NAME, "crew_availability"),
            FlowEdge::new(passenger_rebooking::NAME, customer_communication::NAME, "rebooking_status"),
            FlowEdge::new(airport_resource::NAME, customer_communication::NAME, "facility_status"),
        ];

        let success_criteria = BTreeMap::from([
            (
                passenger_rebooking::NAME.to_string(),
                "rebooking_completion_rate > 90%".to_string(),
            ),
            (
                crew_scheduling::NAME.to_string(),
                "duty_compliance = 100%".to_string(),
            ),
            (
                aircraft_maintenance::NAME.to_string(),
                "aircraft_availability_restored".to_string(),
            ),
            (
                airport_resource::NAME.to_string(),
                "normal_operations_resumed".to_string(),
            ),
            (
                customer_communication::NAME.to_string(),
                "passenger_satisfaction > 80%".to_string(),
            ),
        ]);

        let coordination_types = [
            "maintenance_status",
            "crew_availability",
            "rebooking_status",
            "facility_status",
            "maintenance_coordination",
            "crew_coordination",
            "resource_update",
            "passenger_update",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        Self {
            priority: PriorityPolicy::airline(),
            dependencies,
            communication_flow,
            success_criteria,
            coordination_types,
        }
    }

    /// Edges leaving `worker`.
    pub fn routes_from<'a>(&'a self, worker: &'a str) -> impl Iterator<Item = &'a FlowEdge> {
        self.communication_flow.iter().filter(move |e| e.from == worker)
    }

    pub fn is_coordination_type(&self, message_type: &str) -> bool {
        self.coordination_types.contains(message_type)
    }

    /// Every worker named in the tables must be registered.
    pub fn validate(&self, known: &[String]) -> IropsResult<()> {
        let known: BTreeSet<&str> = known.iter().map(String::as_str).collect();
        let check = |name: &str, role: &str| {
            if known.contains(name) {
                Ok(())
            } else {
                Err(IropsError::Config(format!(
                    "{role} references unknown worker '{name}'"
                )))
            }
        };
        for (worker, upstream) in &self.dependencies {
            check(worker, "dependencies")?;
            for dep in upstream {
                check(dep, "dependencies")?;
            }
        }
        for edge in &self.communication_flow {
            check(&edge.from, "communication_flow")?;
            check(&edge.to, "communication_flow")?;
        }
        for rule in &self.priority.rules {
            check(&rule.worker, "priority rule")?;
        }
        Ok(())
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::airline()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn airline_names() -> Vec<String> {
        PriorityPolicy::airline().default_order
    }

    #[test]
    fn test_airline_topology_is_valid() {
        let topology = Topology::airline();
        topology.validate(&airline_names()).unwrap();
        assert_eq!(topology.communication_flow.len(), 4);
        assert_eq!(topology.success_criteria.len(), 5);
    }

    #[test]
    fn test_routes_from() {
        let topology = Topology::airline();
        let routes: Vec<_> = topology.routes_from("airport_resource").collect();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].to, "customer_communication");
        assert_eq!(routes[0].message_type, "facility_status");
        assert_eq!(topology.routes_from("customer_communication").count(), 0);
    }

    #[test]
    fn test_validate_rejects_unknown_worker() {
        let mut topology = Topology::airline();
        topology
            .communication_flow
            .push(FlowEdge::new("aircraft_maintenance", "ghost", "x"));
        let err = topology.validate(&airline_names()).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_coordination_types() {
        let topology = Topology::airline();
        assert!(topology.is_coordination_type("facility_status"));
        assert!(topology.is_coordination_type("passenger_update"));
        assert!(!topology.is_coordination_type("status_request"));
    }
}
