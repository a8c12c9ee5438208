//! # Infrastructure Layer
//!
//! Adapters behind the application ports.
//!
//! ## Blockchain
//!
//! Signing JSON-RPC client and contract adapters for the PoS deployment,
//! the worker manager and staking pools.
//!
//! ## HTTP clients
//!
//! The gas-station price oracle.
//!
//! ## Monitoring
//!
//! Prometheus metrics owned by the node.

pub mod blockchain;
pub mod http_clients;
pub mod monitoring;
