//! Hard ceiling on the quoted gas price.

use super::GasPriceProvider;
use crate::application::error::{NodeError, NodeResult};
use crate::domain::value_objects::{GasPriceQuote, gwei_to_wei};
use async_trait::async_trait;
use ethers::types::U256;
use std::sync::Arc;

/// Rejects quotes at or above a configured gwei ceiling.
///
/// The compared field is `maxFeePerGas` for EIP-1559 quotes and `gasPrice`
/// otherwise. Accepted quotes pass through unchanged.
#[derive(Debug)]
pub struct SpikeProtectionGasPriceProvider {
    inner: Arc<dyn GasPriceProvider>,
    ceiling: U256,
}

impl SpikeProtectionGasPriceProvider {
    /// Wraps `inner` with a ceiling of `max_gas_price_gwei`.
    #[must_use]
    pub fn new(inner: Arc<dyn GasPriceProvider>, max_gas_price_gwei: u64) -> Self {
        Self {
            inner,
            ceiling: gwei_to_wei(max_gas_price_gwei),
        }
    }

    /// Ceiling in wei.
    #[must_use]
    pub fn ceiling(&self) -> U256 {
        self.ceiling
    }
}

#[async_trait]
impl GasPriceProvider for SpikeProtectionGasPriceProvider {
    fn name(&self) -> &str {
        "spike-protection"
    }

    async fn gas_price(&self) -> NodeResult<GasPriceQuote> {
        let quote = self.inner.gas_price().await?;
        let current = quote.comparable_price();
        if current < self.ceiling {
            return Ok(quote);
        }
        Err(NodeError::GasPriceSpike {
            current,
            ceiling: self.ceiling,
        })
    }
}
