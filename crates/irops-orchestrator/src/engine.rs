use crate::audit::{AuditEntry, AuditLog};
use crate::mailbox::Mailbox;
use crate::monitor::WorkerMonitor;
use crate::topology::Topology;
use crate::types::{
    CoordinationPlan, CoordinationReport, MonitoringConfig, PhaseResults, ProcessedMessage,
    TaskRequest, WorkerInfo,
};
use crate::worker::{Worker, WorkerDeps};
use crate::workers::airline_workers;
use chrono::Utc;
use futures_util::FutureExt;
use irops_agent::Recommender;
use irops_core::{IropsError, IropsResult, JobId, Message};
use irops_store::Store;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Phase names reported by every run, in order.
pub const COORDINATION_PHASES: [&str; 4] = ["Assessment", "Planning", "Execution", "Monitoring"];

/// Tunables for a [`Coordinator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Upper bound on one worker's assessment.
    #[serde(default = "default_assessment_timeout_ms")]
    pub assessment_timeout_ms: u64,
    /// Assessments allowed to run at once.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    #[serde(default = "default_monitoring_interval_secs")]
    pub monitoring_interval_secs: u64,
    /// Offset of `next_review` from the end of the run.
    #[serde(default = "default_review_offset_secs")]
    pub review_offset_secs: i64,
}

fn default_assessment_timeout_ms() -> u64 {
    3000
}

fn default_max_parallel() -> usize {
    5
}

fn default_monitoring_interval_secs() -> u64 {
    300
}

fn default_review_offset_secs() -> i64 {
    1800
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            assessment_timeout_ms: default_assessment_timeout_ms(),
            max_parallel: default_max_parallel(),
            monitoring_interval_secs: default_monitoring_interval_secs(),
            review_offset_secs: default_review_offset_secs(),
        }
    }
}

/// The IROPS coordinator.
/// Runs assessment → planning → execution → monitoring over a fixed worker
/// registry.
pub struct Coordinator {
    workers: Vec<Arc<dyn Worker>>,
    store: Arc<dyn Store>,
    mailbox: Mailbox,
    monitor: WorkerMonitor,
    topology: Topology,
    config: CoordinatorConfig,
    audit: Option<AuditLog>,
}

impl Coordinator {
    /// Build a coordinator over `workers`, kept in the given registry order.
    ///
    /// Fails with `Config` on duplicate worker names or when the topology
    /// references an unregistered worker.
    pub async fn new(
        workers: Vec<Arc<dyn Worker>>,
        store: Arc<dyn Store>,
        topology: Topology,
        config: CoordinatorConfig,
    ) -> IropsResult<Self> {
        let mut seen = HashSet::new();
        for worker in &workers {
            if !seen.insert(worker.name().to_string()) {
                return Err(IropsError::Config(format!(
                    "duplicate worker name '{}'",
                    worker.name()
                )));
            }
        }
        let names: Vec<String> = workers.iter().map(|w| w.name().to_string()).collect();
        topology.validate(&names)?;

        let monitor = WorkerMonitor::new().with_store(store.clone());
        for worker in &workers {
            monitor.register(worker.as_ref()).await;
        }

        info!(workers = ?names, "Coordinator initialized");
        Ok(Self {
            workers,
            mailbox: Mailbox::new(store.clone()),
            store,
            monitor,
            topology,
            config,
            audit: None,
        })
    }

    /// The five airline workers with the default topology.
    pub async fn airline(
        store: Arc<dyn Store>,
        recommender: Arc<dyn Recommender>,
        config: CoordinatorConfig,
    ) -> IropsResult<Self> {
        let deps = WorkerDeps::new(store.clone(), recommender);
        Self::new(airline_workers(&deps), store, Topology::airline(), config).await
    }

    /// Also append one entry per run to `audit`.
    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn monitor(&self) -> &WorkerMonitor {
        &self.monitor
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Registered names in registry order.
    pub fn worker_names(&self) -> Vec<String> {
        self.workers.iter().map(|w| w.name().to_string()).collect()
    }

    fn worker(&self, name: &str) -> Option<&Arc<dyn Worker>> {
        self.workers.iter().find(|w| w.name() == name)
    }

    /// Run the full coordination pipeline for one disruption.
    ///
    /// A missing disruption is the only failure; it is reported before any
    /// worker runs or any message is written. Worker failures are contained
    /// as `error` entries in the report.
    pub async fn run(&self, disruption_id: JobId) -> IropsResult<CoordinationReport> {
        let start = Instant::now();
        let disruption = self
            .store
            .get_disruption(disruption_id)
            .await?
            .ok_or_else(|| IropsError::disruption_not_found(disruption_id))?;

        info!(
            disruption_id,
            kind = %disruption.kind,
            severity = %disruption.severity,
            "Coordinator: starting coordination"
        );

        let assessment_results = self.assess(disruption_id).await;
        let coordination_plan = self.plan(&assessment_results);
        let execution_results = self.execute(&coordination_plan, disruption_id).await;
        let monitoring = self.monitoring(disruption_id);

        let report = CoordinationReport {
            success: true,
            disruption_id,
            coordination_phases: COORDINATION_PHASES.iter().map(ToString::to_string).collect(),
            agents_involved: self.workers.len(),
            assessment_results,
            coordination_plan,
            execution_results,
            monitoring,
            next_review: Utc::now().timestamp() + self.config.review_offset_secs,
        };

        self.record(&report, start.elapsed());
        self.mailbox
            .send(
                "coordinator",
                "system",
                "coordination_complete",
                json!({"disruption_id": disruption_id, "status": "completed"}),
                Some(disruption_id),
            )
            .await;

        Ok(report)
    }

    /// Phase 1: every worker analyzes concurrently, each bounded by the
    /// assessment timeout. Never fails.
    async fn assess(&self, disruption_id: JobId) -> PhaseResults {
        info!(disruption_id, "Coordinator Phase 1: Assessment");
        let permits = Arc::new(Semaphore::new(self.config.max_parallel.max(1)));
        let timeout_ms = self.config.assessment_timeout_ms;

        let handles: Vec<_> = self
            .workers
            .iter()
            .map(|worker| {
                let name = worker.name().to_string();
                let worker = Arc::clone(worker);
                let permits = Arc::clone(&permits);
                let handle = tokio::spawn(async move {
                    let Ok(_permit) = permits.acquire_owned().await else {
                        return json!({"error": "assessment pool closed"});
                    };
                    let analysis = tokio::time::timeout(
                        Duration::from_millis(timeout_ms),
                        worker.analyze_situation(disruption_id),
                    )
                    .await;
                    match analysis {
                        Ok(Ok(value)) => value,
                        Ok(Err(e)) => {
                            error!(worker = worker.name(), error = %e, "Assessment failed");
                            json!({"error": e.to_string()})
                        }
                        Err(_) => {
                            let e = IropsError::WorkerTimeout(format!(
                                "assessment timed out after {timeout_ms}ms"
                            ));
                            warn!(worker = worker.name(), timeout_ms, "Assessment timed out");
                            json!({"error": e.to_string()})
                        }
                    }
                });
                (name, handle)
            })
            .collect();

        let mut results = PhaseResults::new();
        for (name, handle) in handles {
            let value = match handle.await {
                Ok(value) => value,
                Err(e) => {
                    error!(worker = %name, error = %e, "Assessment task aborted");
                    json!({"error": format!("assessment task failed: {e}")})
                }
            };
            debug!(worker = %name, "Assessment collected");
            results.insert(name, value);
        }
        results
    }

    /// Phase 2: order the workers and attach the static tables.
    fn plan(&self, assessments: &PhaseResults) -> CoordinationPlan {
        let priority_sequence = self
            .topology
            .priority
            .order(assessments, &self.worker_names());
        info!(sequence = ?priority_sequence, "Coordinator Phase 2: Planning");
        CoordinationPlan {
            priority_sequence,
            dependencies: self.topology.dependencies.clone(),
            communication_flow: self.topology.communication_flow.clone(),
        }
    }

    /// Phase 3: process sequentially in plan order. A failing worker is
    /// recorded and the phase moves on.
    async fn execute(&self, plan: &CoordinationPlan, disruption_id: JobId) -> PhaseResults {
        info!(disruption_id, "Coordinator Phase 3: Execution");
        let mut results = PhaseResults::new();
        let mut completed: HashSet<&str> = HashSet::new();

        for name in &plan.priority_sequence {
            let Some(worker) = self.worker(name) else {
                warn!(worker = %name, "Planned worker is not registered, skipping");
                continue;
            };

            let unmet: Vec<&str> = plan
                .dependencies
                .get(name)
                .into_iter()
                .flatten()
                .map(String::as_str)
                .filter(|dep| !completed.contains(dep))
                .collect();
            if !unmet.is_empty() {
                warn!(worker = %name, unmet = ?unmet, "Dependencies not met, executing anyway");
            }

            let task = TaskRequest::ProcessDisruption { disruption_id };
            match self.run_task(worker.as_ref(), &task).await {
                Ok(outcome) => {
                    info!(worker = %name, "Worker completed disruption processing");
                    completed.insert(name.as_str());
                    self.route(name, &outcome, disruption_id).await;
                    results.insert(name.clone(), outcome);
                }
                Err(e) => {
                    error!(worker = %name, error = %e, "Execution failed");
                    results.insert(
                        name.clone(),
                        json!({"success": false, "error": e.to_string()}),
                    );
                }
            }
        }
        results
    }

    async fn route(&self, from: &str, outcome: &Value, disruption_id: JobId) {
        for edge in self.topology.routes_from(from) {
            self.mailbox
                .send(
                    from,
                    &edge.to,
                    &edge.message_type,
                    outcome.clone(),
                    Some(disruption_id),
                )
                .await;
        }
    }

    /// Phase 4: a static snapshot. Nothing is scheduled.
    fn monitoring(&self, disruption_id: JobId) -> MonitoringConfig {
        info!(disruption_id, "Coordinator Phase 4: Monitoring");
        MonitoringConfig {
            disruption_id,
            monitoring_interval_secs: self.config.monitoring_interval_secs,
            agents_to_monitor: self.worker_names(),
            success_criteria: self.topology.success_criteria.clone(),
        }
    }

    fn record(&self, report: &CoordinationReport, elapsed: Duration) {
        let errors = report.execution_errors();
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        info!(
            disruption_id = report.disruption_id,
            agents_involved = report.agents_involved,
            phases_completed = report.coordination_phases.len(),
            errors = errors.len(),
            duration_ms,
            "Coordinator: coordination complete"
        );
        if let Some(audit) = &self.audit {
            audit.log(AuditEntry {
                timestamp: Utc::now(),
                disruption_id: report.disruption_id,
                action: "coordinate_disruption".to_string(),
                success: report.success,
                agents_involved: report.agents_involved,
                phases_completed: report.coordination_phases.len(),
                errors,
                details: json!({
                    "priority_sequence": report.coordination_plan.priority_sequence,
                    "duration_ms": duration_ms,
                }),
            });
        }
    }

    /// Status transitions around one task. Panics are caught and reported
    /// as `WorkerFailure`.
    async fn run_task(&self, worker: &dyn Worker, task: &TaskRequest) -> IropsResult<Value> {
        let name = worker.name();
        self.monitor.start_task(name, task.task_type()).await;
        let started = Instant::now();

        let result = match AssertUnwindSafe(worker.handle_task(task)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(IropsError::WorkerFailure(format!("{name} panicked: {detail}")))
            }
        };

        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.monitor.record_duration(name, elapsed).await;
        match &result {
            Ok(_) => self.monitor.finish_task(name, Ok(())).await,
            Err(e) => {
                let message = e.to_string();
                self.monitor.finish_task(name, Err(&message)).await;
            }
        }
        result
    }

    /// Public info for every registered worker.
    pub async fn agent_status(&self) -> BTreeMap<String, WorkerInfo> {
        self.monitor.info().await
    }

    /// Return every worker to `Idle`.
    pub async fn reset_agents(&self) {
        self.monitor.reset_all().await;
        info!(workers = self.workers.len(), "All workers reset to idle");
    }

    /// Run one task on one worker with status tracking.
    ///
    /// Unknown workers are `NotFound`. Task failures, bad parameters, and
    /// unknown task types come back as `{success: false, error}`.
    pub async fn execute_task(
        &self,
        worker_name: &str,
        task_type: &str,
        parameters: &Value,
    ) -> IropsResult<Value> {
        let worker = self
            .worker(worker_name)
            .ok_or_else(|| IropsError::NotFound(format!("Worker {worker_name}")))?;
        let task = match TaskRequest::parse(task_type, parameters) {
            Ok(task) => task,
            Err(e) => return Ok(json!({"success": false, "error": e.to_string()})),
        };
        Ok(self
            .run_task(worker.as_ref(), &task)
            .await
            .unwrap_or_else(|e| json!({"success": false, "error": e.to_string()})))
    }

    /// Drain and answer every pending message addressed to `worker_name`.
    pub async fn process_agent_messages(
        &self,
        worker_name: &str,
    ) -> IropsResult<Vec<ProcessedMessage>> {
        if self.worker(worker_name).is_none() {
            return Err(IropsError::NotFound(format!("Worker {worker_name}")));
        }
        let messages = self.mailbox.pending(worker_name, None, None).await?;
        let mut processed = Vec::with_capacity(messages.len());
        for message in messages {
            let response = self.answer(worker_name, &message).await;
            processed.push(ProcessedMessage {
                message_id: message.id,
                sender: message.sender,
                message_type: message.message_type,
                processed_at: Utc::now(),
                response,
            });
        }
        info!(worker = worker_name, count = processed.len(), "Processed pending messages");
        Ok(processed)
    }

    async fn answer(&self, worker_name: &str, message: &Message) -> Value {
        match message.message_type.as_str() {
            "status_request" => match self.monitor.get_state(worker_name).await {
                Some(state) => serde_json::to_value(WorkerInfo::from(&state))
                    .unwrap_or_else(|e| json!({"error": e.to_string()})),
                None => json!({"error": format!("Worker {worker_name} not found")}),
            },
            "task_assignment" => {
                let task_type = message
                    .content
                    .get("task_type")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let parameters = message
                    .content
                    .get("parameters")
                    .cloned()
                    .unwrap_or_else(|| json!({}));
                self.execute_task(worker_name, task_type, &parameters)
                    .await
                    .unwrap_or_else(|e| json!({"success": false, "error": e.to_string()}))
            }
            t if self.topology.is_coordination_type(t) => json!({
                "acknowledged": true,
                "timestamp": Utc::now().to_rfc3339(),
            }),
            t => json!({"error": format!("Unknown message type: {t}")}),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_empty_table() {
        let config: CoordinatorConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config, CoordinatorConfig::default());
        assert_eq!(config.assessment_timeout_ms, 3000);
        assert_eq!(config.max_parallel, 5);
        assert_eq!(config.monitoring_interval_secs, 300);
        assert_eq!(config.review_offset_secs, 1800);
    }
}
