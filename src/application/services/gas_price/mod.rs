//! # Gas Price Providers
//!
//! Composable strategies that yield a [`GasPriceQuote`].
//!
//! - [`ProviderGasPriceProvider`]: node-suggested price scaled by a percentage
//! - [`Eip1559GasPriceProvider`]: fee-history based EIP-1559 fee pair
//! - [`ChainGasPriceProvider`]: ordered fallback over other providers
//! - [`SpikeProtectionGasPriceProvider`]: ceiling guard, always outermost
//!
//! The external oracle lives in `infrastructure::http_clients` and is plugged
//! in through the `oracle` argument of [`create_gas_price_provider`].
//!
//! # Composition
//!
//! | Requested type | Strategies |
//! |---|---|
//! | `eth-provider` | provider |
//! | `fast`, `fastest`, `safeLow`, `average` | oracle, provider (oracle only on its chain) |
//! | `eip1559-urgent`, `eip1559-fast`, `eip1559-normal` | EIP-1559 (provider if fee history is unsupported) |
//!
//! Whatever is selected is wrapped once in spike protection.

pub mod chain;
pub mod eip1559;
pub mod provider;
pub mod spike_protection;

pub use chain::ChainGasPriceProvider;
pub use eip1559::Eip1559GasPriceProvider;
pub use provider::ProviderGasPriceProvider;
pub use spike_protection::SpikeProtectionGasPriceProvider;

use crate::application::error::{NodeError, NodeResult};
use crate::application::ports::FeeSource;
use crate::domain::value_objects::GasPriceQuote;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// A source of gas-price quotes.
#[async_trait]
pub trait GasPriceProvider: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Returns a fresh quote.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable price is available.
    async fn gas_price(&self) -> NodeResult<GasPriceQuote>;
}

/// Speed profiles published by the gas-station oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OracleProfile {
    /// `fast`
    Fast,
    /// `fastest`
    Fastest,
    /// `safeLow`
    SafeLow,
    /// `average`
    Average,
}

impl OracleProfile {
    /// Key of this profile in the oracle's JSON payload.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Fastest => "fastest",
            Self::SafeLow => "safeLow",
            Self::Average => "average",
        }
    }
}

impl fmt::Display for OracleProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// EIP-1559 urgency profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eip1559Profile {
    /// Highest reward percentile.
    Urgent,
    /// Median reward percentile.
    Fast,
    /// Lowest reward percentile.
    Normal,
}

impl Eip1559Profile {
    /// Profile name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::Fast => "fast",
            Self::Normal => "normal",
        }
    }
}

impl fmt::Display for Eip1559Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gas-price strategy requested by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GasPriceProviderType {
    /// Node-suggested price only.
    #[default]
    EthProvider,
    /// Gas-station oracle, falling back to the node.
    Oracle(OracleProfile),
    /// Fee-history EIP-1559 estimate.
    Eip1559(Eip1559Profile),
}

impl fmt::Display for GasPriceProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EthProvider => f.write_str("eth-provider"),
            Self::Oracle(profile) => write!(f, "{profile}"),
            Self::Eip1559(profile) => write!(f, "eip1559-{profile}"),
        }
    }
}

impl FromStr for GasPriceProviderType {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eth-provider" => Ok(Self::EthProvider),
            "fast" => Ok(Self::Oracle(OracleProfile::Fast)),
            "fastest" => Ok(Self::Oracle(OracleProfile::Fastest)),
            "safeLow" => Ok(Self::Oracle(OracleProfile::SafeLow)),
            "average" => Ok(Self::Oracle(OracleProfile::Average)),
            "eip1559-urgent" => Ok(Self::Eip1559(Eip1559Profile::Urgent)),
            "eip1559-fast" => Ok(Self::Eip1559(Eip1559Profile::Fast)),
            "eip1559-normal" => Ok(Self::Eip1559(Eip1559Profile::Normal)),
            other => Err(NodeError::config(format!(
                "unknown gas price provider type '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for GasPriceProviderType {
    type Error = NodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GasPriceProviderType> for String {
    fn from(value: GasPriceProviderType) -> Self {
        value.to_string()
    }
}

/// One selected strategy, before it is instantiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasStrategy {
    /// External oracle with a speed profile.
    Oracle(OracleProfile),
    /// Node-suggested price scaled by the multiplier.
    Provider,
    /// EIP-1559 fee-history estimate.
    Eip1559(Eip1559Profile),
}

/// Inputs for strategy selection and construction.
#[derive(Debug, Clone)]
pub struct GasPriceSettings {
    /// Requested strategy.
    pub provider_type: GasPriceProviderType,
    /// Percentage applied to the node-suggested price.
    pub gas_price_multiplier: u64,
    /// Spike-protection ceiling, in gwei.
    pub max_gas_price_gwei: u64,
    /// Whether the external oracle may be used.
    pub oracle_enabled: bool,
    /// The only chain id the oracle quotes for.
    pub oracle_chain_id: u64,
}

/// Picks the ordered strategy list for `settings` on network `chain_id`.
#[must_use]
pub fn select_strategies(
    settings: &GasPriceSettings,
    chain_id: u64,
    fee_history_supported: bool,
) -> Vec<GasStrategy> {
    match settings.provider_type {
        GasPriceProviderType::EthProvider => vec![GasStrategy::Provider],
        GasPriceProviderType::Oracle(profile) => {
            if settings.oracle_enabled && chain_id == settings.oracle_chain_id {
                vec![GasStrategy::Oracle(profile), GasStrategy::Provider]
            } else {
                warn!(
                    requested = %settings.provider_type,
                    chain_id,
                    oracle_chain_id = settings.oracle_chain_id,
                    oracle_enabled = settings.oracle_enabled,
                    "gas oracle unavailable on this network, using eth-provider"
                );
                vec![GasStrategy::Provider]
            }
        }
        GasPriceProviderType::Eip1559(profile) => {
            if fee_history_supported {
                vec![GasStrategy::Eip1559(profile)]
            } else {
                warn!(
                    requested = %settings.provider_type,
                    "node does not support eth_feeHistory, using eth-provider"
                );
                vec![GasStrategy::Provider]
            }
        }
    }
}

/// Builds the provider stack for `settings`.
///
/// Reads the network chain id and, for EIP-1559 types, probes
/// `eth_feeHistory` once. `oracle` builds the external oracle client for a
/// profile and is only called when the oracle is selected.
///
/// # Errors
///
/// Returns an error if the chain id cannot be read.
pub async fn create_gas_price_provider<F>(
    fee_source: Arc<dyn FeeSource>,
    settings: &GasPriceSettings,
    oracle: F,
) -> NodeResult<Arc<dyn GasPriceProvider>>
where
    F: Fn(OracleProfile) -> Arc<dyn GasPriceProvider>,
{
    let chain_id = fee_source.chain_id().await?;
    let fee_history_supported = match settings.provider_type {
        GasPriceProviderType::Eip1559(_) => {
            Eip1559GasPriceProvider::probe(fee_source.as_ref()).await
        }
        _ => false,
    };

    let providers: Vec<Arc<dyn GasPriceProvider>> =
        select_strategies(settings, chain_id, fee_history_supported)
            .into_iter()
            .map(|strategy| -> Arc<dyn GasPriceProvider> {
                match strategy {
                    GasStrategy::Oracle(profile) => oracle(profile),
                    GasStrategy::Provider => Arc::new(ProviderGasPriceProvider::new(
                        Arc::clone(&fee_source),
                        settings.gas_price_multiplier,
                    )),
                    GasStrategy::Eip1559(profile) => Arc::new(Eip1559GasPriceProvider::new(
                        Arc::clone(&fee_source),
                        profile,
                    )),
                }
            })
            .collect();

    let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
    info!(
        provider_type = %settings.provider_type,
        chain_id,
        max_gas_price_gwei = settings.max_gas_price_gwei,
        "gas price strategies: {}",
        names.join(" -> ")
    );

    let chain = ChainGasPriceProvider::new(providers);
    Ok(Arc::new(SpikeProtectionGasPriceProvider::new(
        Arc::new(chain),
        settings.max_gas_price_gwei,
    )))
}
