//! # Staking Pool Adapter
//!
//! [`StakingPool`] port over the pool contract. Every write is priced by
//! the [`TransactionManager`].

use crate::application::error::{NodeError, NodeResult};
use crate::application::ports::StakingPool;
use crate::application::services::TransactionManager;
use crate::domain::value_objects::PoolAmounts;
use crate::infrastructure::blockchain::client::{EthClient, SignerClient};
use crate::infrastructure::blockchain::contracts::StakingPoolContract;
use async_trait::async_trait;
use ethers::types::{Address, TxHash};
use std::fmt;
use std::sync::Arc;

/// Pool contract client.
pub struct PoolClient {
    client: Arc<EthClient>,
    contract: StakingPoolContract<SignerClient>,
    tx_manager: TransactionManager,
}

impl fmt::Debug for PoolClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolClient")
            .field("address", &self.contract.address())
            .finish_non_exhaustive()
    }
}

impl PoolClient {
    /// Creates a client for the pool at `address`.
    #[must_use]
    pub fn new(client: Arc<EthClient>, address: Address, tx_manager: TransactionManager) -> Self {
        Self {
            contract: StakingPoolContract::new(address, client.inner()),
            client,
            tx_manager,
        }
    }

    fn read_error(&self, function: &str, err: impl fmt::Display) -> NodeError {
        NodeError::chain(format!(
            "pool {:?}: {function} failed: {err}",
            self.contract.address()
        ))
    }
}

#[async_trait]
impl StakingPool for PoolClient {
    fn address(&self) -> Address {
        self.contract.address()
    }

    async fn amounts(&self) -> NodeResult<PoolAmounts> {
        let (stake, unstake, withdraw) = self
            .contract
            .amounts()
            .call()
            .await
            .map_err(|e| self.read_error("amounts", e))?;
        Ok(PoolAmounts::new(stake, unstake, withdraw))
    }

    async fn rebalance(&self) -> NodeResult<TxHash> {
        self.client
            .send_call(self.contract.rebalance(), &self.tx_manager, "StakingPool.rebalance")
            .await
    }

    async fn can_cycle_stake_maturation(&self) -> NodeResult<bool> {
        self.contract
            .can_cycle_stake_maturation()
            .call()
            .await
            .map_err(|e| self.read_error("canCycleStakeMaturation", e))
    }

    async fn cycle_stake_maturation(&self) -> NodeResult<TxHash> {
        self.client
            .send_call(
                self.contract.cycle_stake_maturation(),
                &self.tx_manager,
                "StakingPool.cycleStakeMaturation",
            )
            .await
    }

    async fn can_cycle_withdraw_release(&self) -> NodeResult<bool> {
        self.contract
            .can_cycle_withdraw_release()
            .call()
            .await
            .map_err(|e| self.read_error("canCycleWithdrawRelease", e))
    }

    async fn cycle_withdraw_release(&self) -> NodeResult<TxHash> {
        self.client
            .send_call(
                self.contract.cycle_withdraw_release(),
                &self.tx_manager,
                "StakingPool.cycleWithdrawRelease",
            )
            .await
    }
}
