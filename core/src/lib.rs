//! Scenario tail analysis: ranks batch-simulation scenarios by their
//! combined top-ups and computes per-year conditional tail expectations.

pub mod aggregate;
pub mod artifact;
pub mod config;
pub mod error;
pub mod loader;
pub mod payload;
pub mod pipeline;
pub mod ranking;
pub mod report;
pub mod tail;
pub mod types;
