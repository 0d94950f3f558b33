//! strain: a controllable synthetic-load harness.
//!
//! A deadline-driven producer feeds a bounded queue in front of a fixed worker
//! pool. Every work unit burns CPU, touches a fresh buffer, optionally fights
//! over one hot lock, and records its latency into a shared sampler. A
//! reporter thread prints progress while the run is live and the harness
//! aggregates a final summary once the pool has drained.

pub mod config;
pub mod counters;
pub mod harness;
pub mod pool;
pub mod probe;
pub mod producer;
pub mod reporter;
pub mod retainer;
pub mod sampler;
pub mod summary;
pub mod task;
pub mod workload;

#[cfg(test)]
mod pool_test;

pub use config::HarnessConfig;
pub use harness::Harness;
pub use summary::RunSummary;
