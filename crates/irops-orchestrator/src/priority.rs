use crate::types::PhaseResults;
use crate::workers::{
    aircraft_maintenance, airport_resource, crew_scheduling, customer_communication,
    passenger_rebooking,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Rank given to workers no rule promoted.
pub const FALLBACK_RANK: u32 = 5;

/// Test applied to one worker's assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleCondition {
    /// String at `pointer` equals `value`.
    Equals {
        source: String,
        pointer: String,
        value: String,
    },
    /// Number at `pointer` is strictly greater than `threshold`.
    GreaterThan {
        source: String,
        pointer: String,
        threshold: f64,
    },
}

impl RuleCondition {
    fn matches(&self, assessments: &PhaseResults) -> bool {
        match self {
            RuleCondition::Equals {
                source,
                pointer,
                value,
            } => assessments
                .get(source)
                .and_then(|a| a.pointer(pointer))
                .and_then(Value::as_str)
                .is_some_and(|v| v == value),
            RuleCondition::GreaterThan {
                source,
                pointer,
                threshold,
            } => assessments
                .get(source)
                .and_then(|a| a.pointer(pointer))
                .and_then(Value::as_f64)
                .is_some_and(|v| v > *threshold),
        }
    }
}

/// Assigns `rank` to `worker` when `condition` holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityRule {
    pub worker: String,
    pub rank: u32,
    pub condition: RuleCondition,
}

/// Derives the execution order from assessment results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityPolicy {
    pub default_order: Vec<String>,
    pub rules: Vec<PriorityRule>,
    #[serde(default = "default_fallback_rank")]
    pub fallback_rank: u32,
}

fn default_fallback_rank() -> u32 {
    FALLBACK_RANK
}

impl PriorityPolicy {
    /// Default order and promotion rules for the airline workers.
    pub fn airline() -> Self {
        Self {
            default_order: vec![
                aircraft_maintenance::NAME.to_string(),
                crew_scheduling::NAME.to_string(),
                airport_resource::NAME.to_string(),
                passenger_rebooking::NAME.to_string(),
                customer_communication::NAME.to_string(),
            ],
            rules: vec![
                PriorityRule {
                    worker: aircraft_maintenance::NAME.to_string(),
                    rank: 1,
                    condition: RuleCondition::Equals {
                        source: aircraft_maintenance::NAME.to_string(),
                        pointer: "/maintenance_urgency".to_string(),
                        value: "critical".to_string(),
                    },
                },
                PriorityRule {
                    worker: crew_scheduling::NAME.to_string(),
                    rank: 2,
                    condition: RuleCondition::GreaterThan {
                        source: crew_scheduling::NAME.to_string(),
                        pointer: "/duty_time_risk/high_risk_crews".to_string(),
                        threshold: 0.0,
                    },
                },
                PriorityRule {
                    worker: customer_communication::NAME.to_string(),
                    rank: 1,
                    condition: RuleCondition::GreaterThan {
                        source: passenger_rebooking::NAME.to_string(),
                        pointer: "/passenger_impact/total_affected".to_string(),
                        threshold: 500.0,
                    },
                },
            ],
            fallback_rank: FALLBACK_RANK,
        }
    }

    /// Execution order over `known`, the registered workers in registry
    /// order.
    ///
    /// Matching rules are applied in declared order and a later match for
    /// the same worker overwrites the earlier rank. The sort is stable over
    /// the default order. The result is always a permutation of `known`.
    pub fn order(&self, assessments: &PhaseResults, known: &[String]) -> Vec<String> {
        let mut ranks: BTreeMap<&str, u32> = BTreeMap::new();
        for rule in &self.rules {
            if rule.condition.matches(assessments) {
                ranks.insert(rule.worker.as_str(), rule.rank);
            }
        }

        let known_set: HashSet<&str> = known.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        let mut sequence: Vec<&str> = self
            .default_order
            .iter()
            .map(String::as_str)
            .filter(|name| known_set.contains(name) && seen.insert(*name))
            .collect();
        sequence.sort_by_key(|name| ranks.get(name).copied().unwrap_or(self.fallback_rank));

        for name in known {
            if seen.insert(name.as_str()) {
                sequence.push(name.as_str());
            }
        }
        sequence.into_iter().map(str::to_string).collect()
    }
}

impl Default for PriorityPolicy {
    fn default() -> Self {
        Self::airline()
    }
}
