//! # Application Layer
//!
//! Use case orchestration and application services.
//!
//! ## Use Cases
//!
//! - [`WorkerLifecycle`]: hire the node, detect retirement, settle funds
//! - [`BlockProducer`]: one production pass over every chain
//! - [`PoolRebalancer`]: throttled pool rebalance and two-phase cycle
//! - [`NodeRunner`]: the polling loop tying them together
//!
//! ## Services
//!
//! - Gas-price providers and the [`TransactionManager`]
//! - [`ChainRegistry`]: lazily created chain clients
//! - [`RetryPolicy`]: retries for connection and hiring

pub mod error;
pub mod ports;
pub mod services;
pub mod use_cases;

pub use error::{NodeError, NodeResult};
pub use ports::{
    ChainClient, FeeSource, NodeAccount, OwnerLookup, ProtocolClient, StakingPool, WorkerManager,
};
pub use services::{
    ChainRegistry, ConfirmationPolicy, GasPriceProvider, GasPriceProviderType, GasPriceSettings,
    RetryError, RetryPolicy, Retryable, TransactionManager, create_gas_price_provider,
    execute_with_retry,
};
pub use use_cases::{
    BlockProducer, ChainOutcome, HireOutcome, NodeRunner, PoolRebalancer, RunOutcome,
    RunnerSettings, Settlement, WorkerLifecycle,
};
