//! HTTP surface for the IROPS coordinator.
//!
//! [`GatewayServer::build`] returns an axum [`Router`](axum::Router) exposing
//! coordination, worker status, and mailbox history as JSON.

/// JSON error responses.
pub mod error;
/// Request tracing middleware.
pub mod middleware;
/// Routes and handlers.
pub mod server;

pub use error::ApiError;
pub use server::{AppState, GatewayServer};
