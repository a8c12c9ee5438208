//! # Ports
//!
//! Capability interfaces the use cases depend on.
//!
//! Every trait here is implemented by an on-chain adapter in
//! `infrastructure::blockchain` and by a hand-written mock in the use-case
//! tests. Nothing behind these traits is cached by the application layer:
//! each call is a fresh read of chain state. Write methods price their own
//! transactions through the
//! [`TransactionManager`](crate::application::services::TransactionManager).

use crate::application::error::NodeResult;
use crate::domain::value_objects::{BlockInterval, PoolAmounts, TxReceiptSummary};
use async_trait::async_trait;
use ethers::types::{Address, FeeHistory, TxHash, U256};
use std::fmt;
use std::sync::Arc;

/// One deployed staking / reward / block-selector instance.
#[async_trait]
pub trait ChainClient: Send + Sync + fmt::Debug {
    /// Index of this chain inside its protocol deployment.
    fn index(&self) -> usize;

    /// Returns true if the protocol still accepts blocks on this chain.
    async fn is_active(&self) -> NodeResult<bool>;

    /// Reward paid for the next block, in CTSI wei.
    async fn current_reward(&self) -> NodeResult<U256>;

    /// Balance that counts towards selection.
    async fn staked_balance(&self, user: Address) -> NodeResult<U256>;

    /// Balance waiting to mature.
    async fn maturing_balance(&self, user: Address) -> NodeResult<U256>;

    /// Unix timestamp (seconds) at which the maturing balance matures.
    async fn maturing_timestamp(&self, user: Address) -> NodeResult<u64>;

    /// Distance between the selector's current block and its goal block.
    async fn block_interval(&self, user: Address) -> NodeResult<BlockInterval>;

    /// On-chain eligibility predicate.
    async fn can_produce_block(&self, user: Address, staked: U256) -> NodeResult<bool>;

    /// Submits the production transaction.
    ///
    /// Implementations price the call through the transaction manager: a
    /// fresh quote, the estimated gas limit scaled by the configured headroom
    /// and the signer's current nonce.
    async fn produce_block(&self) -> NodeResult<TxHash>;
}

/// One protocol deployment and the chains it owns.
#[async_trait]
pub trait ProtocolClient: Send + Sync + fmt::Debug {
    /// Number of chains currently deployed.
    async fn number_of_chains(&self) -> NodeResult<usize>;

    /// Returns true if this node may act for `user` on the protocol.
    async fn is_authorized(&self, user: Address) -> NodeResult<bool>;

    /// Returns the client for chain `index`, creating every missing chain up
    /// to it.
    fn chain(&self, index: usize) -> Arc<dyn ChainClient>;

    /// Runs the pool rebalance. Returns true if a transaction was submitted.
    async fn rebalance(&self) -> NodeResult<bool> {
        Ok(false)
    }

    /// Runs the two-phase pool cycle. Returns true if any transaction was
    /// submitted.
    async fn cycle(&self) -> NodeResult<bool> {
        Ok(false)
    }
}

/// Worker manager contract, keyed by this node's address.
#[async_trait]
pub trait WorkerManager: Send + Sync + fmt::Debug {
    /// Worker is hired.
    async fn is_owned(&self) -> NodeResult<bool>;

    /// Worker is free.
    async fn is_available(&self) -> NodeResult<bool>;

    /// A principal requested this worker.
    async fn is_pending(&self) -> NodeResult<bool>;

    /// Worker was retired by its owner.
    async fn is_retired(&self) -> NodeResult<bool>;

    /// Owner of `worker`. For a pool address this is the pool itself.
    async fn get_owner(&self, worker: Address) -> NodeResult<Address>;

    /// Principal that requested this worker.
    async fn get_user(&self) -> NodeResult<Address>;

    /// Accepts the pending job.
    async fn accept_job(&self) -> NodeResult<TxHash>;
}

/// Staking pool contract.
#[async_trait]
pub trait StakingPool: Send + Sync + fmt::Debug {
    /// Pool address.
    fn address(&self) -> Address;

    /// Queued stake / unstake / withdraw amounts.
    async fn amounts(&self) -> NodeResult<PoolAmounts>;

    /// Submits the rebalance transaction.
    async fn rebalance(&self) -> NodeResult<TxHash>;

    /// Returns true if queued stake may mature now.
    async fn can_cycle_stake_maturation(&self) -> NodeResult<bool>;

    /// Submits the stake maturation transaction.
    async fn cycle_stake_maturation(&self) -> NodeResult<TxHash>;

    /// Returns true if queued withdrawals may be released now.
    async fn can_cycle_withdraw_release(&self) -> NodeResult<bool>;

    /// Submits the withdraw release transaction.
    async fn cycle_withdraw_release(&self) -> NodeResult<TxHash>;
}

/// The node's own signing account.
#[async_trait]
pub trait NodeAccount: Send + Sync + fmt::Debug {
    /// Address of the signing key.
    fn address(&self) -> Address;

    /// Current ETH balance.
    async fn balance(&self) -> NodeResult<U256>;

    /// Pending-inclusive nonce of the signing key.
    async fn nonce(&self) -> NodeResult<U256>;

    /// Gas estimate for a plain value transfer.
    async fn estimate_transfer_gas(&self, to: Address, value: U256) -> NodeResult<U256>;

    /// Sends `value` wei to `to` at a legacy gas price.
    async fn send_transfer(
        &self,
        to: Address,
        value: U256,
        gas_price: U256,
        gas_limit: U256,
    ) -> NodeResult<TxHash>;

    /// Waits until `tx_hash` has `confirmations` confirmations.
    ///
    /// No timeout is applied here; callers race this against their own.
    async fn wait_for_confirmations(
        &self,
        tx_hash: TxHash,
        confirmations: usize,
    ) -> NodeResult<TxReceiptSummary>;
}

/// Node-side gas price data.
#[async_trait]
pub trait FeeSource: Send + Sync + fmt::Debug {
    /// Node-suggested legacy gas price.
    async fn gas_price(&self) -> NodeResult<U256>;

    /// `eth_feeHistory` over the last `block_count` blocks.
    async fn fee_history(&self, block_count: u64, percentiles: &[f64]) -> NodeResult<FeeHistory>;

    /// Network chain id.
    async fn chain_id(&self) -> NodeResult<u64>;
}

/// `owner()` of an ownable contract, used to find a pool's manager.
#[async_trait]
pub trait OwnerLookup: Send + Sync + fmt::Debug {
    /// Returns the owner of `contract`.
    async fn owner_of(&self, contract: Address) -> NodeResult<Address>;
}
