//! Recommendation service for IROPS workers.
//!
//! Workers ask an external text-generation model for free-text advice. The
//! call is always optional: [`best_effort`] turns any failure into a
//! placeholder string so the deterministic analysis is never blocked.

pub mod backends;
pub mod client;
pub mod config;

pub use backends::Recommender;
pub use client::{best_effort, build_recommender, UNAVAILABLE_PREFIX};
pub use config::{RecommenderConfig, RecommenderProvider};
