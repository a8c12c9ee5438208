//! # EIP-1559 Fee Suggestions
//!
//! Fee pair derived from `eth_feeHistory`.
//!
//! The node is asked for the priority-fee rewards paid at the 25th, 50th and
//! 75th percentile over the last [`FEE_HISTORY_BLOCKS`] blocks. For each
//! percentile the median of the non-zero samples becomes the `normal`, `fast`
//! and `urgent` priority fee. The base fee suggestion is the base fee the node
//! projects for the next block (the last entry of `baseFeePerGas`).
//!
//! `maxFeePerGas = maxPriorityFeePerGas + baseFee`.

use super::{Eip1559Profile, GasPriceProvider};
use crate::application::error::{NodeError, NodeResult};
use crate::application::ports::FeeSource;
use crate::domain::value_objects::{GasPriceQuote, format_gwei};
use async_trait::async_trait;
use ethers::types::{FeeHistory, U256};
use std::sync::Arc;
use tracing::{debug, warn};

/// Number of past blocks sampled.
pub const FEE_HISTORY_BLOCKS: u64 = 10;

/// Reward percentiles requested, one per profile (normal, fast, urgent).
pub const REWARD_PERCENTILES: [f64; 3] = [25.0, 50.0, 75.0];

/// Fee suggestions for every profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSuggestion {
    /// Projected base fee of the next block.
    pub base_fee: U256,
    /// Priority fee for [`Eip1559Profile::Normal`].
    pub normal: U256,
    /// Priority fee for [`Eip1559Profile::Fast`].
    pub fast: U256,
    /// Priority fee for [`Eip1559Profile::Urgent`].
    pub urgent: U256,
}

impl FeeSuggestion {
    /// Computes suggestions from a fee history.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::GasPriceUnavailable` if the history carries no
    /// base fee.
    pub fn from_history(history: &FeeHistory) -> NodeResult<Self> {
        let base_fee = history
            .base_fee_per_gas
            .last()
            .copied()
            .ok_or_else(|| NodeError::gas_price_unavailable("fee history has no base fee"))?;

        let column = |i: usize| -> U256 {
            let samples: Vec<U256> = history
                .reward
                .iter()
                .filter_map(|block| block.get(i).copied())
                .filter(|reward| !reward.is_zero())
                .collect();
            median(samples)
        };

        Ok(Self {
            base_fee,
            normal: column(0),
            fast: column(1),
            urgent: column(2),
        })
    }

    /// Priority fee for `profile`.
    #[must_use]
    pub fn priority_fee(&self, profile: Eip1559Profile) -> U256 {
        match profile {
            Eip1559Profile::Normal => self.normal,
            Eip1559Profile::Fast => self.fast,
            Eip1559Profile::Urgent => self.urgent,
        }
    }
}

fn median(mut samples: Vec<U256>) -> U256 {
    if samples.is_empty() {
        return U256::zero();
    }
    samples.sort_unstable();
    let mid = samples.len() / 2;
    if samples.len() % 2 == 1 {
        samples[mid]
    } else {
        (samples[mid - 1] + samples[mid]) / 2
    }
}

/// EIP-1559 provider for one urgency profile.
#[derive(Debug)]
pub struct Eip1559GasPriceProvider {
    fee_source: Arc<dyn FeeSource>,
    profile: Eip1559Profile,
}

impl Eip1559GasPriceProvider {
    /// Creates a provider for `profile`.
    #[must_use]
    pub fn new(fee_source: Arc<dyn FeeSource>, profile: Eip1559Profile) -> Self {
        Self {
            fee_source,
            profile,
        }
    }

    /// Returns true if the node answers `eth_feeHistory`.
    pub async fn probe(fee_source: &dyn FeeSource) -> bool {
        match fee_source.fee_history(1, &REWARD_PERCENTILES).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "eth_feeHistory probe failed");
                false
            }
        }
    }
}

#[async_trait]
impl GasPriceProvider for Eip1559GasPriceProvider {
    fn name(&self) -> &str {
        "eip1559"
    }

    async fn gas_price(&self) -> NodeResult<GasPriceQuote> {
        let history = self
            .fee_source
            .fee_history(FEE_HISTORY_BLOCKS, &REWARD_PERCENTILES)
            .await?;
        let suggestion = FeeSuggestion::from_history(&history)?;
        let priority = suggestion.priority_fee(self.profile);
        let max_fee = priority.saturating_add(suggestion.base_fee);

        debug!(
            profile = %self.profile,
            base_fee_gwei = %format_gwei(suggestion.base_fee),
            "eip1559: maxFeePerGas {} gwei, maxPriorityFeePerGas {} gwei",
            format_gwei(max_fee),
            format_gwei(priority)
        );
        Ok(GasPriceQuote::eip1559(max_fee, priority))
    }
}
