//! Core types and error definitions for the IROPS coordinator.
//!
//! This crate provides the records shared across every other crate in the
//! workspace: disruptions, flights, inter-worker messages, and the unified
//! error enum.
//!
//! # Main types
//!
//! - [`IropsError`]: Unified error enum for all subsystems.
//! - [`IropsResult`]: Convenience alias for `Result<T, IropsError>`.
//! - [`Disruption`]: The unit of work the coordinator processes.
//! - [`Flight`]: A flight referenced by a disruption.
//! - [`Message`]: A mailbox entry exchanged between workers.

/// Disruption, flight, and worker records.
pub mod domain;
/// Inter-worker mailbox messages.
pub mod message;

pub use domain::{
    total_passengers, Disruption, DisruptionKind, DisruptionStatus, Flight, FlightId, FlightStatus,
    JobId, Severity, WorkerRecord, WorkerStatus,
};
pub use message::{Message, MessageId};

// --- Error types ---

/// Top-level error type for the IROPS coordinator.
///
/// Each variant corresponds to a failure class. Most of them are contained at
/// a worker or phase boundary and downgraded to a structured JSON entry; only
/// the initial disruption lookup of a coordination run surfaces them.
#[derive(Debug, thiserror::Error)]
pub enum IropsError {
    /// A disruption, flight, worker, or message does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A worker's assessment exceeded its time bound.
    #[error("Worker timeout: {0}")]
    WorkerTimeout(String),

    /// A worker failed while analyzing or processing.
    #[error("Worker failure: {0}")]
    WorkerFailure(String),

    /// The external recommendation service failed or is unavailable.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// A storage read or write failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An error from an outbound or inbound HTTP exchange.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`IropsError`].
pub type IropsResult<T> = Result<T, IropsError>;

impl IropsError {
    /// Shorthand for a missing disruption.
    pub fn disruption_not_found(id: JobId) -> Self {
        IropsError::NotFound(format!("Disruption {id}"))
    }

    /// True for the `NotFound` variant.
    pub fn is_not_found(&self) -> bool {
        matches!(self, IropsError::NotFound(_))
    }
}
