//! # Node Metrics
//!
//! Prometheus gauges and counters owned by a single [`NodeMetrics`] value.
//!
//! The registry is private to the value; the exposition server that serves
//! [`NodeMetrics::encode`] is an external collaborator.

use crate::domain::value_objects::to_f64_units;
use ethers::types::U256;
use prometheus::{Encoder, Gauge, IntCounter, Opts, Registry, TextEncoder};

/// Node observability signals.
#[derive(Debug, Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// ETH balance of the node account.
    pub balance: Gauge,
    /// Stake of the principal, per the last chain read.
    pub stake: Gauge,
    /// Eligibility checks performed.
    pub eligibility: IntCounter,
    /// Eligibility checks that returned true.
    pub eligibility_granted: IntCounter,
    /// Blocks produced.
    pub blocks: IntCounter,
    /// Pool rebalances submitted.
    pub rebalances: IntCounter,
    /// Caught errors.
    pub errors: IntCounter,
}

impl NodeMetrics {
    /// Creates and registers every metric in a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if two metrics share a name.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let balance = Gauge::with_opts(Opts::new(
            "pos_node_balance_eth",
            "ETH balance of the node account",
        ))?;
        let stake = Gauge::with_opts(Opts::new(
            "pos_node_stake_ctsi",
            "Staked balance of the principal",
        ))?;
        let eligibility =
            IntCounter::new("pos_node_eligibility_total", "Block eligibility checks")?;
        let eligibility_granted = IntCounter::new(
            "pos_node_eligibility_granted_total",
            "Eligibility checks that granted production",
        )?;
        let blocks = IntCounter::new("pos_node_block_total", "Blocks produced")?;
        let rebalances = IntCounter::new("pos_node_rebalance_total", "Pool rebalances")?;
        let errors = IntCounter::new("pos_node_errors_total", "Caught errors")?;

        registry.register(Box::new(balance.clone()))?;
        registry.register(Box::new(stake.clone()))?;
        registry.register(Box::new(eligibility.clone()))?;
        registry.register(Box::new(eligibility_granted.clone()))?;
        registry.register(Box::new(blocks.clone()))?;
        registry.register(Box::new(rebalances.clone()))?;
        registry.register(Box::new(errors.clone()))?;

        Ok(Self {
            registry,
            balance,
            stake,
            eligibility,
            eligibility_granted,
            blocks,
            rebalances,
            errors,
        })
    }

    /// Sets the balance gauge from a wei amount.
    pub fn set_balance(&self, wei: U256) {
        self.balance.set(to_f64_units(wei));
    }

    /// Sets the stake gauge from a CTSI wei amount.
    pub fn set_stake(&self, wei: U256) {
        self.stake.set(to_f64_units(wei));
    }

    /// Renders every metric in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
