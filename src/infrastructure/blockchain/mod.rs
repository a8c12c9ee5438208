//! # Blockchain
//!
//! On-chain adapters: the signing client, the contract bindings and the
//! PoS, staking-pool and worker-manager clients built on them.

pub mod client;
pub mod contracts;
pub mod pool;
pub mod pos;
pub mod worker_manager;

pub use client::{EthClient, HttpProvider, SignerClient, apply_overrides};
pub use pool::PoolClient;
pub use pos::{PosChain, PosProtocol, ProductionRoute};
pub use worker_manager::WorkerManagerClient;
