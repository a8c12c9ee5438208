//! # Application Services
//!
//! Services shared by the use cases.
//!
//! - [`gas_price`]: composable gas-price strategies
//! - [`TransactionManager`]: quote + gas-limit headroom into overrides
//! - [`ChainRegistry`]: lazily created per-index chain clients
//! - [`ConfirmationPolicy`]: confirmation count and timeout
//! - [`retry`]: retry policy used for connection and hiring

pub mod chain_registry;
pub mod confirmation;
pub mod gas_price;
pub mod retry;
pub mod transaction_manager;

pub use chain_registry::ChainRegistry;
pub use confirmation::ConfirmationPolicy;
pub use gas_price::{
    ChainGasPriceProvider, Eip1559GasPriceProvider, Eip1559Profile, GasPriceProvider,
    GasPriceProviderType, GasPriceSettings, GasStrategy, OracleProfile, ProviderGasPriceProvider,
    SpikeProtectionGasPriceProvider, create_gas_price_provider, select_strategies,
};
pub use retry::{RetryError, RetryPolicy, RetryResult, Retryable, execute_with_retry};
pub use transaction_manager::{DEFAULT_GAS_LIMIT_MULTIPLIER, TransactionManager};
