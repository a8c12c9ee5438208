//! # PoS Worker Node
//!
//! Worker node for a proof-of-stake block-production lottery running on an
//! Ethereum-compatible chain.
//!
//! The node is hired by a principal (an individual staker or a staking pool),
//! polls every chain of the PoS deployment, submits `produceBlock` whenever the
//! principal is selected and, for pools, keeps the stake queues rebalanced.
//! When the principal retires the worker it returns its residual funds and
//! stops.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain`): value objects with no I/O (gas quotes,
//!   overrides, worker state, block intervals, pool amounts)
//! - **Application Layer** (`application`): capability ports, gas pricing,
//!   transaction management and the node use cases
//! - **Infrastructure Layer** (`infrastructure`): ethers contract adapters,
//!   the HTTP gas oracle and prometheus metrics
//!
//! ## Example
//!
//! ```rust,ignore
//! use pos_node::application::use_cases::NodeRunner;
//! use pos_node::config::NodeConfig;
//!
//! let config = NodeConfig::load()?;
//! config.validate()?;
//! let runner = NodeRunner::new(lifecycle, account, factory, metrics, config.runner_settings());
//! runner.run().await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
