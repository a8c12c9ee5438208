//! Node-suggested gas price, scaled by an integer percentage.

use super::GasPriceProvider;
use crate::application::error::NodeResult;
use crate::application::ports::FeeSource;
use crate::domain::value_objects::{GasPriceQuote, format_gwei, scale_percent};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// `eth_gasPrice * multiplier / 100`.
#[derive(Debug)]
pub struct ProviderGasPriceProvider {
    fee_source: Arc<dyn FeeSource>,
    multiplier: u64,
}

impl ProviderGasPriceProvider {
    /// Creates a provider with a percentage multiplier (`160` = +60%).
    #[must_use]
    pub fn new(fee_source: Arc<dyn FeeSource>, multiplier: u64) -> Self {
        Self {
            fee_source,
            multiplier,
        }
    }

    /// Returns the percentage multiplier.
    #[must_use]
    pub fn multiplier(&self) -> u64 {
        self.multiplier
    }
}

#[async_trait]
impl GasPriceProvider for ProviderGasPriceProvider {
    fn name(&self) -> &str {
        "eth-provider"
    }

    async fn gas_price(&self) -> NodeResult<GasPriceQuote> {
        let suggested = self.fee_source.gas_price().await?;
        let gas_price = scale_percent(suggested, self.multiplier);
        debug!(
            suggested_gwei = %format_gwei(suggested),
            multiplier = self.multiplier,
            "eth-provider: {} gwei",
            format_gwei(gas_price)
        );
        Ok(GasPriceQuote::legacy(gas_price))
    }
}
