use crate::types::{WorkerInfo, WorkerMetrics, WorkerState};
use crate::worker::Worker;
use chrono::Utc;
use irops_core::{WorkerRecord, WorkerStatus};
use irops_store::Store;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Tracks status and metrics for every registered worker.
///
/// Status is advisory: concurrent runs may interleave transitions. When a
/// store is attached each transition is mirrored to it, and mirror failures
/// are logged and swallowed.
#[derive(Clone, Default)]
pub struct WorkerMonitor {
    states: Arc<RwLock<BTreeMap<String, WorkerState>>>,
    store: Option<Arc<dyn Store>>,
}

impl WorkerMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror every transition to `store`.
    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Add a worker in `Idle` state. Re-registering resets it.
    pub async fn register(&self, worker: &dyn Worker) {
        let state = WorkerState {
            name: worker.name().to_string(),
            display_name: worker.display_name().to_string(),
            status: WorkerStatus::Idle,
            current_task: None,
            capabilities: worker.capabilities().iter().map(ToString::to_string).collect(),
            last_activity: Utc::now(),
            metrics: WorkerMetrics::default(),
        };
        self.states
            .write()
            .await
            .insert(state.name.clone(), state.clone());
        self.mirror(&state).await;
    }

    /// `Processing`, with `current_task` set to "Executing <task_type>".
    pub async fn start_task(&self, name: &str, task_type: &str) {
        self.transition(name, |state| {
            state.status = WorkerStatus::Processing;
            state.current_task = Some(format!("Executing {task_type}"));
        })
        .await;
    }

    /// `Active` on success; `Error` with the message otherwise.
    pub async fn finish_task(&self, name: &str, result: Result<(), &str>) {
        self.transition(name, |state| match result {
            Ok(()) => {
                state.status = WorkerStatus::Active;
                state.current_task = Some("Ready for next task".to_string());
                state.metrics.tasks_completed += 1;
            }
            Err(e) => {
                state.status = WorkerStatus::Error;
                state.current_task = Some(format!("Error: {e}"));
                state.metrics.errors += 1;
            }
        })
        .await;
    }

    pub async fn record_duration(&self, name: &str, duration_ms: u64) {
        let mut states = self.states.write().await;
        if let Some(state) = states.get_mut(name) {
            state.metrics.duration_ms += duration_ms;
        }
    }

    /// Every worker back to `Idle` with no current task. Metrics are kept.
    pub async fn reset_all(&self) {
        let reset: Vec<WorkerState> = {
            let mut states = self.states.write().await;
            let now = Utc::now();
            states
                .values_mut()
                .map(|state| {
                    state.status = WorkerStatus::Idle;
                    state.current_task = None;
                    state.last_activity = now;
                    state.clone()
                })
                .collect()
        };
        for state in &reset {
            self.mirror(state).await;
        }
    }

    pub async fn get_state(&self, name: &str) -> Option<WorkerState> {
        self.states.read().await.get(name).cloned()
    }

    pub async fn snapshot(&self) -> Vec<WorkerState> {
        self.states.read().await.values().cloned().collect()
    }

    /// Public info keyed by worker name.
    pub async fn info(&self) -> BTreeMap<String, WorkerInfo> {
        self.states
            .read()
            .await
            .iter()
            .map(|(name, state)| (name.clone(), WorkerInfo::from(state)))
            .collect()
    }

    /// Serialize the current state as JSON, with aggregate metrics.
    pub async fn to_json(&self) -> serde_json::Value {
        let states = self.snapshot().await;
        let mut aggregate = WorkerMetrics::default();
        for state in &states {
            aggregate.tasks_completed += state.metrics.tasks_completed;
            aggregate.errors += state.metrics.errors;
            aggregate.duration_ms += state.metrics.duration_ms;
        }
        serde_json::json!({
            "agents": states,
            "aggregate": aggregate,
        })
    }

    async fn transition(&self, name: &str, apply: impl FnOnce(&mut WorkerState)) {
        let updated = {
            let mut states = self.states.write().await;
            let Some(state) = states.get_mut(name) else {
                warn!(worker = name, "Status update for unregistered worker");
                return;
            };
            apply(state);
            state.last_activity = Utc::now();
            state.clone()
        };
        self.mirror(&updated).await;
    }

    async fn mirror(&self, state: &WorkerState) {
        let Some(store) = &self.store else {
            return;
        };
        let record = WorkerRecord {
            name: state.name.clone(),
            display_name: state.display_name.clone(),
            status: state.status,
            capabilities: state.capabilities.clone(),
            current_task: state.current_task.clone(),
            last_activity: state.last_activity,
        };
        if let Err(e) = store.upsert_worker(&record).await {
            warn!(worker = %state.name, error = %e, "Failed to persist worker status");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::Recommendation;
    use async_trait::async_trait;
    use irops_core::{IropsResult, JobId};
    use irops_store::MemoryStore;
    use serde_json::Value;

    struct Named(&'static str);

    #[async_trait]
    impl Worker for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn display_name(&self) -> &str {
            "Named Worker"
        }
        fn capabilities(&self) -> &[&'static str] {
            &["testing"]
        }
        async fn analyze_situation(&self, _: JobId) -> IropsResult<Value> {
            Ok(Value::Null)
        }
        async fn process_disruption(&self, _: JobId) -> IropsResult<Value> {
            Ok(Value::Null)
        }
        fn generate_recommendations(&self, _: &Value) -> Vec<Recommendation> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn test_transitions() {
        let monitor = WorkerMonitor::new();
        monitor.register(&Named("w")).await;
        assert_eq!(monitor.get_state("w").await.unwrap().status, WorkerStatus::Idle);

        monitor.start_task("w", "process_disruption").await;
        let state = monitor.get_state("w").await.unwrap();
        assert_eq!(state.status, WorkerStatus::Processing);
        assert_eq!(state.current_task.as_deref(), Some("Executing process_disruption"));

        monitor.finish_task("w", Err("boom")).await;
        let state = monitor.get_state("w").await.unwrap();
        assert_eq!(state.status, WorkerStatus::Error);
        assert_eq!(state.current_task.as_deref(), Some("Error: boom"));
        assert_eq!(state.metrics.errors, 1);

        monitor.start_task("w", "process_disruption").await;
        monitor.finish_task("w", Ok(())).await;
        let state = monitor.get_state("w").await.unwrap();
        assert_eq!(state.status, WorkerStatus::Active);
        assert_eq!(state.metrics.tasks_completed, 1);
    }

    #[tokio::test]
    async fn test_reset_all_and_mirror() {
        let store = Arc::new(MemoryStore::new());
        let monitor = WorkerMonitor::new().with_store(store.clone());
        monitor.register(&Named("a")).await;
        monitor.register(&Named("b")).await;
        monitor.start_task("a", "x").await;
        monitor.finish_task("b", Err("bad")).await;

        monitor.reset_all().await;
        for state in monitor.snapshot().await {
            assert_eq!(state.status, WorkerStatus::Idle);
            assert!(state.current_task.is_none());
        }
        let records = store.list_workers().await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.status == WorkerStatus::Idle));
    }

    #[tokio::test]
    async fn test_unknown_worker_is_ignored() {
        let monitor = WorkerMonitor::new();
        monitor.start_task("ghost", "x").await;
        assert!(monitor.get_state("ghost").await.is_none());
        assert!(monitor.info().await.is_empty());
    }

    #[tokio::test]
    async fn test_to_json() {
        let monitor = WorkerMonitor::new();
        monitor.register(&Named("w")).await;
        monitor.record_duration("w", 40).await;
        let json = monitor.to_json().await;
        assert!(json["agents"].is_array());
        assert_eq!(json["aggregate"]["duration_ms"], 40);
    }
}
