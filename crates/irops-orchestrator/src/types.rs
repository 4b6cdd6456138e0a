use chrono::{DateTime, Utc};
use irops_core::{IropsError, IropsResult, JobId, MessageId, WorkerStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Per-worker JSON outcomes keyed by worker name.
pub type PhaseResults = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationPriority {
    Critical,
    High,
    Medium,
    Low,
}

/// A deterministic recommendation derived from an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: RecommendationPriority,
    pub action: String,
    pub rationale: String,
}

impl Recommendation {
    pub fn new(
        priority: RecommendationPriority,
        action: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            priority,
            action: action.into(),
            rationale: rationale.into(),
        }
    }
}

/// A unit of work addressed to one worker.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskRequest {
    ProcessDisruption { disruption_id: JobId },
    AnalyzeSituation { disruption_id: JobId },
    GenerateRecommendations { analysis: Value },
    /// Any other `task_type`; answered with an error outcome.
    Unknown(String),
}

impl TaskRequest {
    /// Build a request from a `task_type` and its `parameters` object.
    pub fn parse(task_type: &str, parameters: &Value) -> IropsResult<Self> {
        let disruption_id = || {
            parameters
                .get("disruption_id")
                .and_then(Value::as_i64)
                .ok_or_else(|| {
                    IropsError::WorkerFailure(format!(
                        "{task_type} requires an integer disruption_id parameter"
                    ))
                })
        };
        Ok(match task_type {
            "process_disruption" => TaskRequest::ProcessDisruption {
                disruption_id: disruption_id()?,
            },
            "analyze_situation" => TaskRequest::AnalyzeSituation {
                disruption_id: disruption_id()?,
            },
            "generate_recommendations" => TaskRequest::GenerateRecommendations {
                analysis: parameters.clone(),
            },
            other => TaskRequest::Unknown(other.to_string()),
        })
    }

    pub fn task_type(&self) -> &str {
        match self {
            TaskRequest::ProcessDisruption { .. } => "process_disruption",
            TaskRequest::AnalyzeSituation { .. } => "analyze_situation",
            TaskRequest::GenerateRecommendations { .. } => "generate_recommendations",
            TaskRequest::Unknown(t) => t,
        }
    }
}

/// Metrics tracked per worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerMetrics {
    pub tasks_completed: u32,
    pub errors: u32,
    pub duration_ms: u64,
}

/// Real-time snapshot of a worker's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerState {
    pub name: String,
    pub display_name: String,
    pub status: WorkerStatus,
    pub current_task: Option<String>,
    pub capabilities: Vec<String>,
    pub last_activity: DateTime<Utc>,
    pub metrics: WorkerMetrics,
}

/// Public view returned by `agent_status` and `status_request` messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerInfo {
    pub name: String,
    pub display_name: String,
    pub status: WorkerStatus,
    pub current_task: Option<String>,
    pub capabilities: Vec<String>,
}

impl From<&WorkerState> for WorkerInfo {
    fn from(state: &WorkerState) -> Self {
        Self {
            name: state.name.clone(),
            display_name: state.display_name.clone(),
            status: state.status,
            current_task: state.current_task.clone(),
            capabilities: state.capabilities.clone(),
        }
    }
}

/// One routing edge: outcomes of `from` are forwarded to `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub from: String,
    pub to: String,
    pub message_type: String,
}

impl FlowEdge {
    pub fn new(from: &str, to: &str, message_type: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            message_type: message_type.to_string(),
        }
    }
}

/// Ordering, dependency, and routing table for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationPlan {
    pub priority_sequence: Vec<String>,
    pub dependencies: BTreeMap<String, Vec<String>>,
    pub communication_flow: Vec<FlowEdge>,
}

/// Static snapshot produced by the Monitoring phase. Nothing is scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub disruption_id: JobId,
    pub monitoring_interval_secs: u64,
    pub agents_to_monitor: Vec<String>,
    pub success_criteria: BTreeMap<String, String>,
}

/// Result of a full coordination run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationReport {
    pub success: bool,
    pub disruption_id: JobId,
    pub coordination_phases: Vec<String>,
    pub agents_involved: usize,
    pub assessment_results: PhaseResults,
    pub coordination_plan: CoordinationPlan,
    pub execution_results: PhaseResults,
    pub monitoring: MonitoringConfig,
    /// Unix seconds.
    pub next_review: i64,
}

impl CoordinationReport {
    /// `error` strings nested in the execution results.
    pub fn execution_errors(&self) -> Vec<String> {
        self.execution_results
            .values()
            .filter_map(|v| v.get("error").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }
}

/// Answer to one drained mailbox message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedMessage {
    pub message_id: MessageId,
    pub sender: String,
    pub message_type: String,
    pub processed_at: DateTime<Utc>,
    pub response: Value,
}
