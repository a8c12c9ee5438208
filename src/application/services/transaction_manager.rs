//! # Transaction Manager
//!
//! Turns a gas-price provider and a gas-limit headroom into ready-to-send
//! [`TransactionOverrides`].
//!
//! Gas estimates are taken against the state at estimation time; the
//! headroom percentage (`160` by default) absorbs state drift until the
//! transaction is mined.

use crate::application::error::NodeResult;
use crate::application::services::gas_price::GasPriceProvider;
use crate::domain::value_objects::{TransactionOverrides, scale_percent};
use ethers::types::U256;
use std::sync::Arc;
use tracing::debug;

/// Default gas-limit headroom, in percent.
pub const DEFAULT_GAS_LIMIT_MULTIPLIER: u64 = 160;

/// Builds transaction overrides.
#[derive(Debug, Clone)]
pub struct TransactionManager {
    gas_price_provider: Arc<dyn GasPriceProvider>,
    gas_limit_multiplier: u64,
}

impl TransactionManager {
    /// Creates a manager.
    #[must_use]
    pub fn new(gas_price_provider: Arc<dyn GasPriceProvider>, gas_limit_multiplier: u64) -> Self {
        Self {
            gas_price_provider,
            gas_limit_multiplier,
        }
    }

    /// Returns the gas-limit headroom in percent.
    #[must_use]
    pub fn gas_limit_multiplier(&self) -> u64 {
        self.gas_limit_multiplier
    }

    /// Returns the gas price provider.
    #[must_use]
    pub fn gas_price_provider(&self) -> &Arc<dyn GasPriceProvider> {
        &self.gas_price_provider
    }

    /// Scales a gas estimate by the headroom (`estimate * M / 100`).
    #[must_use]
    pub fn gas_limit(&self, estimate: U256) -> U256 {
        scale_percent(estimate, self.gas_limit_multiplier)
    }

    /// Fetches a fresh quote and, if given, scales the gas estimate.
    ///
    /// # Errors
    ///
    /// Propagates the provider's error (exhausted chain or spike refusal).
    pub async fn overrides(&self, gas_estimate: Option<U256>) -> NodeResult<TransactionOverrides> {
        let quote = self.gas_price_provider.gas_price().await?;
        let mut overrides = TransactionOverrides::new(quote);
        if let Some(estimate) = gas_estimate {
            overrides = overrides.with_gas_limit(self.gas_limit(estimate));
        }
        debug!(
            gas_price = %overrides.gas_price,
            gas_limit = ?overrides.gas_limit,
            "transaction overrides"
        );
        Ok(overrides)
    }

    /// Same as [`overrides`](Self::overrides), pinned to `nonce`.
    ///
    /// # Errors
    ///
    /// Propagates the provider's error.
    pub async fn overrides_with_nonce(
        &self,
        gas_estimate: Option<U256>,
        nonce: U256,
    ) -> NodeResult<TransactionOverrides> {
        Ok(self.overrides(gas_estimate).await?.with_nonce(nonce))
    }
}
