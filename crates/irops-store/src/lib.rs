//! Storage handle for the IROPS coordinator.
//!
//! The coordinator never talks to a database directly: it is handed an
//! `Arc<dyn Store>` at construction. Two backends are provided, an in-memory
//! store for tests and demos and a SQLite store for durable deployments.

/// In-memory backend.
pub mod memory;
/// SQLite backend.
#[cfg(feature = "sqlite")]
pub mod sqlite;
/// The `Store` trait and query types.
pub mod store;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
pub use store::{MessageQuery, Store};
