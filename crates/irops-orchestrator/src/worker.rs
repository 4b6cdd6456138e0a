use crate::mailbox::Mailbox;
use crate::types::{Recommendation, TaskRequest};
use async_trait::async_trait;
use chrono::Utc;
use irops_agent::{best_effort, Recommender};
use irops_core::{Disruption, Flight, IropsError, IropsResult, JobId};
use irops_store::Store;
use serde_json::{json, Value};
use std::sync::Arc;

/// Shared handles every worker is constructed with.
#[derive(Clone)]
pub struct WorkerDeps {
    pub store: Arc<dyn Store>,
    pub mailbox: Mailbox,
    pub recommender: Arc<dyn Recommender>,
}

impl WorkerDeps {
    pub fn new(store: Arc<dyn Store>, recommender: Arc<dyn Recommender>) -> Self {
        Self {
            mailbox: Mailbox::new(store.clone()),
            store,
            recommender,
        }
    }

    /// Fresh read of a disruption and its affected flights.
    pub async fn load(&self, disruption_id: JobId) -> IropsResult<Option<(Disruption, Vec<Flight>)>> {
        let Some(disruption) = self.store.get_disruption(disruption_id).await? else {
            return Ok(None);
        };
        let flights = self.store.get_flights(&disruption.affected_flights).await?;
        Ok(Some((disruption, flights)))
    }

    /// Best-effort recommender call wrapped as `{<key>: text, generated_at}`.
    pub async fn advise(&self, key: &str, prompt: &str) -> Value {
        let text = best_effort(self.recommender.as_ref(), prompt).await;
        let mut block = serde_json::Map::new();
        block.insert(key.to_string(), Value::String(text));
        block.insert("generated_at".to_string(), json!(Utc::now().to_rfc3339()));
        Value::Object(block)
    }
}

/// A named unit that analyzes and processes disruptions for one domain.
///
/// `analyze_situation` and `process_disruption` report a missing disruption
/// as an `error` field inside `Ok`; `Err` is reserved for storage and other
/// infrastructure failures, which the coordinator downgrades the same way.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Registry key, also used as mailbox address.
    fn name(&self) -> &str;

    fn display_name(&self) -> &str;

    fn capabilities(&self) -> &[&'static str];

    async fn analyze_situation(&self, disruption_id: JobId) -> IropsResult<Value>;

    async fn process_disruption(&self, disruption_id: JobId) -> IropsResult<Value>;

    /// Deterministic thresholds over an analysis. Missing fields fall back to
    /// neutral defaults.
    fn generate_recommendations(&self, analysis: &Value) -> Vec<Recommendation>;

    /// Dispatch a task request to the matching operation.
    async fn handle_task(&self, task: &TaskRequest) -> IropsResult<Value> {
        match task {
            TaskRequest::ProcessDisruption { disruption_id } => {
                self.process_disruption(*disruption_id).await
            }
            TaskRequest::AnalyzeSituation { disruption_id } => {
                self.analyze_situation(*disruption_id).await
            }
            TaskRequest::GenerateRecommendations { analysis } => {
                Ok(serde_json::to_value(self.generate_recommendations(analysis))?)
            }
            TaskRequest::Unknown(task_type) => Ok(json!({
                "success": false,
                "error": format!("Unknown task type: {task_type}"),
            })),
        }
    }
}

/// `process_disruption` outcome for a missing disruption.
pub fn missing_outcome(disruption_id: JobId) -> Value {
    json!({
        "success": false,
        "error": IropsError::disruption_not_found(disruption_id).to_string(),
    })
}

/// `analyze_situation` result for a missing disruption.
pub fn missing_analysis(disruption_id: JobId) -> Value {
    json!({"error": IropsError::disruption_not_found(disruption_id).to_string()})
}

pub(crate) fn text_at<'a>(value: &'a Value, pointer: &str, default: &'a str) -> &'a str {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or(default)
}

pub(crate) fn number_at(value: &Value, pointer: &str) -> f64 {
    value.pointer(pointer).and_then(Value::as_f64).unwrap_or(0.0)
}
