//! Four-phase coordination engine for airline irregular operations.
//!
//! A disruption is handed to a fixed registry of domain workers. They assess
//! it in parallel, a priority policy orders them, they process it in that
//! order while exchanging context through a persisted mailbox, and the run
//! ends with a monitoring snapshot and an audit entry.
//!
//! # Main types
//!
//! - [`Coordinator`]: Runs assessment, planning, execution, and monitoring.
//! - [`Worker`]: Trait implemented by each domain worker.
//! - [`Mailbox`]: Read-once message queue between workers.
//! - [`WorkerMonitor`]: Tracks worker status and metrics.
//! - [`PriorityPolicy`]: Derives execution order from assessments.
//! - [`Topology`]: Dependencies, routing, and success criteria.

/// Append-only JSONL audit log of coordination runs.
pub mod audit;
/// Coordinator engine and configuration.
pub mod engine;
/// Persisted inter-worker mailbox.
pub mod mailbox;
/// Worker status and metrics monitoring.
pub mod monitor;
/// Execution ordering rules.
pub mod priority;
/// Static coordination tables.
pub mod topology;
/// Shared coordination types (reports, plans, task requests, etc.).
pub mod types;
/// The `Worker` trait and shared worker handles.
pub mod worker;
/// Airline domain workers.
pub mod workers;

pub use audit::{AuditEntry, AuditLog};
pub use engine::{Coordinator, CoordinatorConfig, COORDINATION_PHASES};
pub use mailbox::Mailbox;
pub use monitor::WorkerMonitor;
pub use priority::{PriorityPolicy, PriorityRule, RuleCondition};
pub use topology::Topology;
pub use types::{
    CoordinationPlan, CoordinationReport, FlowEdge, MonitoringConfig, PhaseResults,
    ProcessedMessage, Recommendation, RecommendationPriority, TaskRequest, WorkerInfo,
    WorkerMetrics, WorkerState,
};
pub use worker::{Worker, WorkerDeps};
pub use workers::airline_workers;
