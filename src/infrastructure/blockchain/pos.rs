//! # Proof-of-Stake Adapter
//!
//! [`PosProtocol`] and [`PosChain`] implement the protocol and chain ports
//! on top of the PoS contract.
//!
//! Each chain resolves its staking, reward-manager and block-selector
//! contracts on first use and keeps them for the life of the process. Block
//! production goes either straight to the PoS contract or, for a staking
//! pool, through the pool contract, which forwards to PoS on the pool's
//! behalf.

use crate::application::error::{NodeError, NodeResult};
use crate::application::ports::{ChainClient, NodeAccount, ProtocolClient};
use crate::application::services::{ChainRegistry, TransactionManager};
use crate::application::use_cases::PoolRebalancer;
use crate::domain::value_objects::BlockInterval;
use crate::infrastructure::blockchain::client::{EthClient, SignerClient};
use crate::infrastructure::blockchain::contracts::{
    BlockSelector, ProofOfStake, RewardManager, Staking, StakingPoolContract, WorkerAuthManager,
};
use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// Where production transactions are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductionRoute {
    /// `PoS.produceBlock` from the worker.
    Direct,
    /// `StakingPool.produceBlock` on the given pool.
    Pool(Address),
}

/// One chain of the PoS deployment.
pub struct PosChain {
    index: usize,
    client: Arc<EthClient>,
    pos: ProofOfStake<SignerClient>,
    route: ProductionRoute,
    tx_manager: TransactionManager,
    staking: OnceCell<Staking<SignerClient>>,
    reward_manager: OnceCell<RewardManager<SignerClient>>,
    block_selector: OnceCell<BlockSelector<SignerClient>>,
}

impl fmt::Debug for PosChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PosChain")
            .field("index", &self.index)
            .field("pos", &self.pos.address())
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}

impl PosChain {
    /// Creates the adapter for chain `index`.
    #[must_use]
    pub fn new(
        index: usize,
        client: Arc<EthClient>,
        pos_address: Address,
        route: ProductionRoute,
        tx_manager: TransactionManager,
    ) -> Self {
        Self {
            index,
            pos: ProofOfStake::new(pos_address, client.inner()),
            client,
            route,
            tx_manager,
            staking: OnceCell::new(),
            reward_manager: OnceCell::new(),
            block_selector: OnceCell::new(),
        }
    }

    fn chain_index(&self) -> U256 {
        U256::from(self.index)
    }

    async fn staking(&self) -> NodeResult<&Staking<SignerClient>> {
        self.staking
            .get_or_try_init(|| async {
                let address = self
                    .pos
                    .get_staking_address(self.chain_index())
                    .call()
                    .await
                    .map_err(|e| self.read_error("getStakingAddress", e))?;
                debug!("[chain {}] Staking resolved to {:?}", self.index, address);
                Ok(Staking::new(address, self.client.inner()))
            })
            .await
    }

    async fn reward_manager(&self) -> NodeResult<&RewardManager<SignerClient>> {
        self.reward_manager
            .get_or_try_init(|| async {
                let address = self
                    .pos
                    .get_reward_manager_address(self.chain_index())
                    .call()
                    .await
                    .map_err(|e| self.read_error("getRewardManagerAddress", e))?;
                debug!("[chain {}] RewardManager resolved to {:?}", self.index, address);
                Ok(RewardManager::new(address, self.client.inner()))
            })
            .await
    }

    async fn block_selector(&self) -> NodeResult<&BlockSelector<SignerClient>> {
        self.block_selector
            .get_or_try_init(|| async {
                let address = self
                    .pos
                    .get_block_selector_address(self.chain_index())
                    .call()
                    .await
                    .map_err(|e| self.read_error("getBlockSelectorAddress", e))?;
                debug!("[chain {}] BlockSelector resolved to {:?}", self.index, address);
                Ok(BlockSelector::new(address, self.client.inner()))
            })
            .await
    }

    async fn block_selector_index(&self) -> NodeResult<U256> {
        self.pos
            .get_block_selector_index(self.chain_index())
            .call()
            .await
            .map_err(|e| self.read_error("getBlockSelectorIndex", e))
    }

    fn read_error(&self, function: &str, err: impl fmt::Display) -> NodeError {
        NodeError::chain(format!("chain {}: {function} failed: {err}", self.index))
    }
}

#[async_trait]
impl ChainClient for PosChain {
    fn index(&self) -> usize {
        self.index
    }

    async fn is_active(&self) -> NodeResult<bool> {
        self.pos
            .is_active(self.chain_index())
            .call()
            .await
            .map_err(|e| self.read_error("isActive", e))
    }

    async fn current_reward(&self) -> NodeResult<U256> {
        self.reward_manager()
            .await?
            .get_current_reward()
            .call()
            .await
            .map_err(|e| self.read_error("getCurrentReward", e))
    }

    async fn staked_balance(&self, user: Address) -> NodeResult<U256> {
        self.staking()
            .await?
            .get_staked_balance(user)
            .call()
            .await
            .map_err(|e| self.read_error("getStakedBalance", e))
    }

    async fn maturing_balance(&self, user: Address) -> NodeResult<U256> {
        self.staking()
            .await?
            .get_maturing_balance(user)
            .call()
            .await
            .map_err(|e| self.read_error("getMaturingBalance", e))
    }

    async fn maturing_timestamp(&self, user: Address) -> NodeResult<u64> {
        let timestamp = self
            .staking()
            .await?
            .get_maturing_timestamp(user)
            .call()
            .await
            .map_err(|e| self.read_error("getMaturingTimestamp", e))?;
        Ok(saturating_u64(timestamp))
    }

    async fn block_interval(&self, user: Address) -> NodeResult<BlockInterval> {
        let selector = self.block_selector().await?;
        let selector_index = self.block_selector_index().await?;
        let state = selector
            .get_state(selector_index, user)
            .call()
            .await
            .map_err(|e| self.read_error("getState", e))?;
        Ok(BlockInterval::between(state[0], state[1]))
    }

    async fn can_produce_block(&self, user: Address, staked: U256) -> NodeResult<bool> {
        let selector = self.block_selector().await?;
        let selector_index = self.block_selector_index().await?;
        selector
            .can_produce_block(selector_index, user, staked)
            .call()
            .await
            .map_err(|e| self.read_error("canProduceBlock", e))
    }

    async fn produce_block(&self) -> NodeResult<TxHash> {
        match self.route {
            ProductionRoute::Direct => {
                let call = self.pos.produce_block(self.chain_index());
                self.client
                    .send_call(call, &self.tx_manager, "PoS.produceBlock")
                    .await
            }
            ProductionRoute::Pool(pool) => {
                let call = StakingPoolContract::new(pool, self.client.inner())
                    .produce_block(self.chain_index());
                self.client
                    .send_call(call, &self.tx_manager, "StakingPool.produceBlock")
                    .await
            }
        }
    }
}

/// The PoS deployment seen by one worker.
pub struct PosProtocol {
    worker: Address,
    pos: ProofOfStake<SignerClient>,
    auth_manager: WorkerAuthManager<SignerClient>,
    chains: ChainRegistry,
    rebalancer: Option<PoolRebalancer>,
}

impl fmt::Debug for PosProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PosProtocol")
            .field("worker", &self.worker)
            .field("pos", &self.pos.address())
            .field("chains", &self.chains)
            .field("rebalancer", &self.rebalancer)
            .finish()
    }
}

impl PosProtocol {
    /// Creates the protocol client.
    ///
    /// Pool mode is enabled by passing [`ProductionRoute::Pool`] together
    /// with the pool's rebalancer.
    #[must_use]
    pub fn new(
        client: Arc<EthClient>,
        pos_address: Address,
        worker_manager_address: Address,
        route: ProductionRoute,
        tx_manager: TransactionManager,
        rebalancer: Option<PoolRebalancer>,
    ) -> Self {
        let worker = client.address();
        let pos = ProofOfStake::new(pos_address, client.inner());
        let auth_manager = WorkerAuthManager::new(worker_manager_address, client.inner());
        let chains = ChainRegistry::new(move |index| -> Arc<dyn ChainClient> {
            Arc::new(PosChain::new(
                index,
                Arc::clone(&client),
                pos_address,
                route,
                tx_manager.clone(),
            ))
        });

        Self {
            worker,
            pos,
            auth_manager,
            chains,
            rebalancer,
        }
    }
}

#[async_trait]
impl ProtocolClient for PosProtocol {
    async fn number_of_chains(&self) -> NodeResult<usize> {
        let count = self
            .pos
            .current_index()
            .call()
            .await
            .map_err(|e| NodeError::chain(format!("currentIndex failed: {e}")))?;
        chain_count(count)
    }

    async fn is_authorized(&self, user: Address) -> NodeResult<bool> {
        let authorized = self
            .auth_manager
            .is_authorized(self.worker, self.pos.address())
            .call()
            .await
            .map_err(|e| NodeError::chain(format!("isAuthorized failed: {e}")))?;
        debug!(
            "[{:?}] authorized for {:?} on {:?}: {}",
            self.worker,
            user,
            self.pos.address(),
            authorized
        );
        Ok(authorized)
    }

    fn chain(&self, index: usize) -> Arc<dyn ChainClient> {
        self.chains.get(index)
    }

    async fn rebalance(&self) -> NodeResult<bool> {
        match &self.rebalancer {
            Some(rebalancer) => rebalancer.rebalance().await,
            None => Ok(false),
        }
    }

    async fn cycle(&self) -> NodeResult<bool> {
        match &self.rebalancer {
            Some(rebalancer) => rebalancer.cycle().await,
            None => Ok(false),
        }
    }
}

fn chain_count(count: U256) -> NodeResult<usize> {
    u64::try_from(count)
        .ok()
        .and_then(|count| usize::try_from(count).ok())
        .ok_or_else(|| NodeError::chain(format!("chain count {count} out of range")))
}

/// Timestamps past `u64::MAX` read as "never".
fn saturating_u64(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn chain_count_fits_in_usize() {
        assert_eq!(chain_count(U256::from(3u64)).unwrap(), 3);
        assert_eq!(chain_count(U256::zero()).unwrap(), 0);
    }

    #[test]
    fn oversized_chain_count_is_a_chain_error() {
        let count = U256::from(u64::MAX) + U256::one();

        let err = chain_count(count).unwrap_err();

        assert!(matches!(err, NodeError::Chain(_)));
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn oversized_timestamp_saturates() {
        assert_eq!(saturating_u64(U256::from(1_700_000_000u64)), 1_700_000_000);
        assert_eq!(saturating_u64(U256::from(u64::MAX) + U256::one()), u64::MAX);
        assert_eq!(saturating_u64(U256::MAX), u64::MAX);
    }
}
