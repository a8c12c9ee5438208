//! Ordered fallback over several gas-price providers.

use super::GasPriceProvider;
use crate::application::error::{NodeError, NodeResult};
use crate::domain::value_objects::GasPriceQuote;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::error;

/// Message returned when every provider failed.
pub const CHAIN_EXHAUSTED: &str =
    "no valid gas price returned from the chain of gas price providers";

/// Tries each provider in order and returns the first quote.
#[derive(Debug)]
pub struct ChainGasPriceProvider {
    providers: Vec<Arc<dyn GasPriceProvider>>,
}

impl ChainGasPriceProvider {
    /// Creates a chain from an ordered provider list.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn GasPriceProvider>>) -> Self {
        Self { providers }
    }

    /// Providers in the order they are tried.
    #[must_use]
    pub fn providers(&self) -> &[Arc<dyn GasPriceProvider>] {
        &self.providers
    }
}

#[async_trait]
impl GasPriceProvider for ChainGasPriceProvider {
    fn name(&self) -> &str {
        "chain"
    }

    async fn gas_price(&self) -> NodeResult<GasPriceQuote> {
        for provider in &self.providers {
            match provider.gas_price().await {
                Ok(quote) => return Ok(quote),
                Err(e) => {
                    error!(provider = provider.name(), error = %e, "failed to retrieve gas price");
                }
            }
        }
        Err(NodeError::gas_price_unavailable(CHAIN_EXHAUSTED))
    }
}
