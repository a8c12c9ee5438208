//! # Use Cases
//!
//! Node workflows built on the capability ports.
//!
//! Each use case reads chain state afresh on every call, submits at most the
//! transactions it owns and reports failures to its caller.

pub mod node_runner;
pub mod produce_block;
pub mod rebalance;
pub mod worker_lifecycle;

#[cfg(test)]
mod tests;

pub use node_runner::{
    Iteration, NodeRunner, ProtocolFactory, RunOutcome, RunnerSettings, Session, Start,
};
pub use produce_block::{BlockProducer, ChainOutcome};
pub use rebalance::{DEFAULT_REBALANCE_INTERVAL, PoolRebalancer, RebalanceState};
pub use worker_lifecycle::{HireOutcome, Settlement, WorkerLifecycle};
