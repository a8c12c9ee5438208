//! # Use Case Scenario Tests
//!
//! Reusable mocks of the capability ports and end-to-end scenarios for the
//! block producer, worker lifecycle, pool rebalancer and node runner.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::clone_on_ref_ptr)]
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};

use crate::application::error::{NodeError, NodeResult};
use crate::application::ports::{
    ChainClient, NodeAccount, OwnerLookup, ProtocolClient, StakingPool, WorkerManager,
};
use crate::application::services::gas_price::test_support::StaticFeeSource;
use crate::application::services::{ChainRegistry, ConfirmationPolicy, RetryPolicy};
use crate::application::use_cases::node_runner::{
    Iteration, NodeRunner, ProtocolFactory, RunOutcome, RunnerSettings, Start,
};
use crate::application::use_cases::produce_block::{BlockProducer, ChainOutcome};
use crate::application::use_cases::rebalance::PoolRebalancer;
use crate::application::use_cases::worker_lifecycle::{
    HireOutcome, Settlement, WorkerLifecycle,
};
use crate::domain::value_objects::{
    BlockInterval, PoolAmounts, TxReceiptSummary, WorkerState, gwei_to_wei,
};
use crate::infrastructure::monitoring::NodeMetrics;

// ============================================================================
// Reusable Mock Implementations
// ============================================================================

fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

fn hash(n: u64) -> TxHash {
    TxHash::from_low_u64_be(n)
}

fn ctsi(n: u64) -> U256 {
    U256::from(n) * U256::exp10(18)
}

const WORKER: u64 = 0xAA;
const USER: u64 = 0xBB;
const POOL: u64 = 0xCC;
const POOL_OWNER: u64 = 0xDD;

/// Mock signing account.
#[derive(Debug)]
pub struct MockAccount {
    address: Address,
    balance: Mutex<U256>,
    transfer_gas: U256,
    transfers: Mutex<Vec<(Address, U256, U256, U256)>>,
    confirmations: AtomicUsize,
    hang_confirmations: AtomicBool,
}

impl MockAccount {
    pub fn new(balance: U256) -> Self {
        Self {
            address: addr(WORKER),
            balance: Mutex::new(balance),
            transfer_gas: U256::from(21_000u64),
            transfers: Mutex::new(Vec::new()),
            confirmations: AtomicUsize::new(0),
            hang_confirmations: AtomicBool::new(false),
        }
    }

    pub fn hang_confirmations(&self) {
        self.hang_confirmations.store(true, Ordering::SeqCst);
    }

    pub fn transfers(&self) -> Vec<(Address, U256, U256, U256)> {
        self.transfers.lock().unwrap().clone()
    }

    pub fn confirmations(&self) -> usize {
        self.confirmations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeAccount for MockAccount {
    fn address(&self) -> Address {
        self.address
    }

    async fn balance(&self) -> NodeResult<U256> {
        Ok(*self.balance.lock().unwrap())
    }

    async fn nonce(&self) -> NodeResult<U256> {
        Ok(U256::zero())
    }

    async fn estimate_transfer_gas(&self, _to: Address, _value: U256) -> NodeResult<U256> {
        Ok(self.transfer_gas)
    }

    async fn send_transfer(
        &self,
        to: Address,
        value: U256,
        gas_price: U256,
        gas_limit: U256,
    ) -> NodeResult<TxHash> {
        self.transfers
            .lock()
            .unwrap()
            .push((to, value, gas_price, gas_limit));
        Ok(hash(0x7))
    }

    async fn wait_for_confirmations(
        &self,
        tx_hash: TxHash,
        _confirmations: usize,
    ) -> NodeResult<TxReceiptSummary> {
        if self.hang_confirmations.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.confirmations.fetch_add(1, Ordering::SeqCst);
        Ok(TxReceiptSummary::new(tx_hash).with_gas_used(U256::from(50_000u64)))
    }
}

/// Mock worker manager driven by a state script.
///
/// Every `is_owned` read that finds the worker not owned advances the
/// script by one entry until only the last entry remains.
#[derive(Debug)]
pub struct MockWorkerManager {
    script: Mutex<VecDeque<WorkerState>>,
    owners: Mutex<HashMap<Address, Address>>,
    user: Address,
    accept_calls: AtomicUsize,
    failing_accepts: AtomicUsize,
    hanging_accepts: AtomicUsize,
    ownership_reads: AtomicUsize,
}

impl MockWorkerManager {
    pub fn with_script(states: &[WorkerState]) -> Self {
        Self {
            script: Mutex::new(states.iter().copied().collect()),
            owners: Mutex::new(HashMap::new()),
            user: addr(USER),
            accept_calls: AtomicUsize::new(0),
            failing_accepts: AtomicUsize::new(0),
            hanging_accepts: AtomicUsize::new(0),
            ownership_reads: AtomicUsize::new(0),
        }
    }

    pub fn in_state(state: WorkerState) -> Self {
        Self::with_script(&[state])
    }

    pub fn with_owner(self, of: Address, owner: Address) -> Self {
        self.owners.lock().unwrap().insert(of, owner);
        self
    }

    /// The next `count` acceptances are rejected by the chain.
    pub fn failing_first_accepts(self, count: usize) -> Self {
        self.failing_accepts.store(count, Ordering::SeqCst);
        self
    }

    /// The next `count` acceptances never complete.
    pub fn hanging_first_accepts(self, count: usize) -> Self {
        self.hanging_accepts.store(count, Ordering::SeqCst);
        self
    }

    pub fn accept_calls(&self) -> usize {
        self.accept_calls.load(Ordering::SeqCst)
    }

    /// Number of `is_owned` reads, one per full state read.
    pub fn ownership_reads(&self) -> usize {
        self.ownership_reads.load(Ordering::SeqCst)
    }

    fn take_one(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn current(&self) -> WorkerState {
        *self.script.lock().unwrap().front().expect("script is empty")
    }

    fn advance(&self) {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front();
        }
    }

    fn set(&self, state: WorkerState) {
        let mut script = self.script.lock().unwrap();
        script.clear();
        script.push_back(state);
    }
}

#[async_trait]
impl WorkerManager for MockWorkerManager {
    async fn is_owned(&self) -> NodeResult<bool> {
        self.ownership_reads.fetch_add(1, Ordering::SeqCst);
        let owned = self.current() == WorkerState::Owned;
        if !owned {
            self.advance();
        }
        Ok(owned)
    }

    async fn is_available(&self) -> NodeResult<bool> {
        Ok(self.current() == WorkerState::Available)
    }

    async fn is_pending(&self) -> NodeResult<bool> {
        Ok(self.current() == WorkerState::Pending)
    }

    async fn is_retired(&self) -> NodeResult<bool> {
        Ok(self.current() == WorkerState::Retired)
    }

    async fn get_owner(&self, worker: Address) -> NodeResult<Address> {
        let owners = self.owners.lock().unwrap();
        Ok(match owners.get(&worker) {
            Some(owner) => *owner,
            None if worker == addr(WORKER) => self.user,
            None => Address::zero(),
        })
    }

    async fn get_user(&self) -> NodeResult<Address> {
        Ok(self.user)
    }

    async fn accept_job(&self) -> NodeResult<TxHash> {
        self.accept_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_one(&self.hanging_accepts) {
            std::future::pending::<()>().await;
        }
        if Self::take_one(&self.failing_accepts) {
            return Err(NodeError::chain("nonce too low"));
        }
        self.set(WorkerState::Owned);
        Ok(hash(0x1))
    }
}

/// Mock `owner()` lookup.
#[derive(Debug)]
pub struct MockOwnerLookup {
    owner: Address,
}

#[async_trait]
impl OwnerLookup for MockOwnerLookup {
    async fn owner_of(&self, _contract: Address) -> NodeResult<Address> {
        Ok(self.owner)
    }
}

/// Mock chain with fixed reads.
#[derive(Debug)]
pub struct MockChain {
    index: usize,
    active: bool,
    reward: U256,
    staked: U256,
    maturing: U256,
    maturing_timestamp: u64,
    eligible: bool,
    interval: u64,
    fail_produce: bool,
    produced: AtomicUsize,
}

impl MockChain {
    pub fn eligible(index: usize, interval: u64) -> Self {
        Self {
            index,
            active: true,
            reward: ctsi(2_900),
            staked: ctsi(1_000_000),
            maturing: U256::zero(),
            maturing_timestamp: 0,
            eligible: true,
            interval,
            fail_produce: false,
            produced: AtomicUsize::new(0),
        }
    }

    pub fn inactive(index: usize) -> Self {
        Self {
            active: false,
            ..Self::eligible(index, 1)
        }
    }

    pub fn unstaked(index: usize) -> Self {
        Self {
            staked: U256::zero(),
            ..Self::eligible(index, 1)
        }
    }

    pub fn produced(&self) -> usize {
        self.produced.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn index(&self) -> usize {
        self.index
    }

    async fn is_active(&self) -> NodeResult<bool> {
        Ok(self.active)
    }

    async fn current_reward(&self) -> NodeResult<U256> {
        Ok(self.reward)
    }

    async fn staked_balance(&self, _user: Address) -> NodeResult<U256> {
        Ok(self.staked)
    }

    async fn maturing_balance(&self, _user: Address) -> NodeResult<U256> {
        Ok(self.maturing)
    }

    async fn maturing_timestamp(&self, _user: Address) -> NodeResult<u64> {
        Ok(self.maturing_timestamp)
    }

    async fn block_interval(&self, _user: Address) -> NodeResult<BlockInterval> {
        Ok(BlockInterval::new(U256::from(self.interval)))
    }

    async fn can_produce_block(&self, _user: Address, _staked: U256) -> NodeResult<bool> {
        Ok(self.eligible)
    }

    async fn produce_block(&self) -> NodeResult<TxHash> {
        if self.fail_produce {
            return Err(NodeError::chain("execution reverted: too early"));
        }
        self.produced.fetch_add(1, Ordering::SeqCst);
        Ok(hash(0x100 + self.index as u64))
    }
}

/// Mock protocol backed by a [`ChainRegistry`].
#[derive(Debug)]
pub struct MockProtocol {
    registry: ChainRegistry,
    count: usize,
    authorized: bool,
    rebalancer: Option<PoolRebalancer>,
}

impl MockProtocol {
    pub fn new(chains: Vec<Arc<MockChain>>, authorized: bool) -> Self {
        let count = chains.len();
        let registry = ChainRegistry::new(move |i| -> Arc<dyn ChainClient> { chains[i].clone() });
        Self {
            registry,
            count,
            authorized,
            rebalancer: None,
        }
    }

    pub fn with_rebalancer(mut self, rebalancer: PoolRebalancer) -> Self {
        self.rebalancer = Some(rebalancer);
        self
    }
}

#[async_trait]
impl ProtocolClient for MockProtocol {
    async fn number_of_chains(&self) -> NodeResult<usize> {
        Ok(self.count)
    }

    async fn is_authorized(&self, _user: Address) -> NodeResult<bool> {
        Ok(self.authorized)
    }

    fn chain(&self, index: usize) -> Arc<dyn ChainClient> {
        self.registry.get(index)
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

/// Mock staking pool.
#[derive(Debug)]
pub struct MockPool {
    amounts: Mutex<PoolAmounts>,
    can_mature: bool,
    can_release: bool,
    rebalances: AtomicUsize,
    maturations: AtomicUsize,
    releases: AtomicUsize,
}

impl MockPool {
    pub fn new(amounts: PoolAmounts) -> Self {
        Self {
            amounts: Mutex::new(amounts),
            can_mature: false,
            can_release: false,
            rebalances: AtomicUsize::new(0),
            maturations: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }

    pub fn rebalances(&self) -> usize {
        self.rebalances.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StakingPool for MockPool {
    fn address(&self) -> Address {
        addr(POOL)
    }

    async fn amounts(&self) -> NodeResult<PoolAmounts> {
        Ok(*self.amounts.lock().unwrap())
    }

    async fn rebalance(&self) -> NodeResult<TxHash> {
        self.rebalances.fetch_add(1, Ordering::SeqCst);
        Ok(hash(0x200))
    }

    async fn can_cycle_stake_maturation(&self) -> NodeResult<bool> {
        Ok(self.can_mature)
    }

    async fn cycle_stake_maturation(&self) -> NodeResult<TxHash> {
        self.maturations.fetch_add(1, Ordering::SeqCst);
        Ok(hash(0x201))
    }

    async fn can_cycle_withdraw_release(&self) -> NodeResult<bool> {
        Ok(self.can_release)
    }

    async fn cycle_withdraw_release(&self) -> NodeResult<TxHash> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(hash(0x202))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn metrics() -> Arc<NodeMetrics> {
    Arc::new(NodeMetrics::new().unwrap())
}

fn fast_confirmation() -> ConfirmationPolicy {
    ConfirmationPolicy::new(1, Duration::from_millis(50))
}

fn producer(
    protocol: MockProtocol,
    account: Arc<MockAccount>,
    metrics: Arc<NodeMetrics>,
) -> BlockProducer {
    BlockProducer::new(Arc::new(protocol), account, fast_confirmation(), metrics)
}

fn lifecycle(
    worker_manager: Arc<MockWorkerManager>,
    account: Arc<MockAccount>,
    gas_price: U256,
) -> WorkerLifecycle {
    WorkerLifecycle::new(
        worker_manager,
        account,
        Arc::new(StaticFeeSource::new(gas_price, 1)),
        Arc::new(MockOwnerLookup {
            owner: addr(POOL_OWNER),
        }),
        fast_confirmation(),
        Duration::from_millis(5),
        RetryPolicy::unbounded_fixed(Duration::from_millis(5), Some(Duration::from_secs(5))),
    )
}

fn rebalancer(pool: Arc<MockPool>, account: Arc<MockAccount>, metrics: Arc<NodeMetrics>) -> PoolRebalancer {
    PoolRebalancer::new(
        pool,
        account,
        fast_confirmation(),
        Duration::from_secs(60 * 60),
        metrics,
    )
}

// ============================================================================
// BlockProducer
// ============================================================================

#[tokio::test]
async fn inactive_and_unstaked_chains_submit_nothing() {
    let chain0 = Arc::new(MockChain::inactive(0));
    let chain1 = Arc::new(MockChain::unstaked(1));
    let protocol = MockProtocol::new(vec![chain0.clone(), chain1.clone()], true);
    let account = Arc::new(MockAccount::new(U256::exp10(18)));
    let metrics = metrics();
    let producer = producer(protocol, account.clone(), metrics.clone());

    let ran = producer.produce_block(addr(USER)).await.unwrap();

    assert!(ran);
    assert_eq!(chain0.produced() + chain1.produced(), 0);
    assert_eq!(account.confirmations(), 0);
    assert_eq!(metrics.errors.get(), 0);
}

#[tokio::test]
async fn unauthorized_pass_visits_no_chain() {
    let chain = Arc::new(MockChain::eligible(0, 10));
    let protocol = MockProtocol::new(vec![chain.clone()], false);
    let producer = producer(protocol, Arc::new(MockAccount::new(U256::one())), metrics());

    let ran = producer.produce_block(addr(USER)).await.unwrap();

    assert!(!ran);
    assert_eq!(chain.produced(), 0);
}

#[tokio::test]
async fn zero_chains_completes_immediately() {
    let producer = producer(
        MockProtocol::new(Vec::new(), true),
        Arc::new(MockAccount::new(U256::one())),
        metrics(),
    );
    assert!(producer.produce_block(addr(USER)).await.unwrap());
}

#[tokio::test]
async fn eligible_chain_produces_and_counts() {
    let chain = Arc::new(MockChain::eligible(0, 100));
    let account = Arc::new(MockAccount::new(U256::exp10(18)));
    let metrics = metrics();
    let producer = producer(
        MockProtocol::new(vec![chain.clone()], true),
        account.clone(),
        metrics.clone(),
    );

    let outcome = producer
        .produce_on_chain(chain.as_ref(), addr(USER))
        .await
        .unwrap();

    assert!(outcome.is_produced());
    assert_eq!(chain.produced(), 1);
    assert_eq!(account.confirmations(), 1);
    assert_eq!(metrics.blocks.get(), 1);
    assert_eq!(metrics.eligibility.get(), 1);
    assert_eq!(metrics.eligibility_granted.get(), 1);
}

#[tokio::test]
async fn rollover_window_skips_submission() {
    for interval in [256u64, 254, 255, 512 + 255] {
        let chain = Arc::new(MockChain::eligible(0, interval));
        let producer = producer(
            MockProtocol::new(vec![chain.clone()], true),
            Arc::new(MockAccount::new(U256::one())),
            metrics(),
        );

        let outcome = producer
            .produce_on_chain(chain.as_ref(), addr(USER))
            .await
            .unwrap();

        assert!(matches!(outcome, ChainOutcome::RolloverWindow(_)), "interval {interval}");
        assert_eq!(chain.produced(), 0);
    }
}

#[tokio::test]
async fn not_eligible_is_counted_but_not_granted() {
    let chain = Arc::new(MockChain {
        eligible: false,
        ..MockChain::eligible(0, 10)
    });
    let metrics = metrics();
    let producer = producer(
        MockProtocol::new(vec![chain.clone()], true),
        Arc::new(MockAccount::new(U256::one())),
        metrics.clone(),
    );

    let outcome = producer
        .produce_on_chain(chain.as_ref(), addr(USER))
        .await
        .unwrap();

    assert_eq!(outcome, ChainOutcome::NotEligible);
    assert_eq!(metrics.eligibility.get(), 1);
    assert_eq!(metrics.eligibility_granted.get(), 0);
}

#[tokio::test]
async fn confirmation_timeout_is_scoped_to_its_chain() {
    let chain0 = Arc::new(MockChain::eligible(0, 10));
    let chain1 = Arc::new(MockChain::eligible(1, 20));
    let account = Arc::new(MockAccount::new(U256::exp10(18)));
    account.hang_confirmations();
    let metrics = metrics();
    let producer = producer(
        MockProtocol::new(vec![chain0.clone(), chain1.clone()], true),
        account.clone(),
        metrics.clone(),
    );

    let err = producer
        .produce_on_chain(chain0.as_ref(), addr(USER))
        .await
        .unwrap_err();
    assert!(err.is_confirmation_timeout());

    let ran = producer.produce_block(addr(USER)).await.unwrap();

    assert!(ran);
    assert_eq!(chain0.produced(), 2);
    assert_eq!(chain1.produced(), 1);
    assert_eq!(metrics.errors.get(), 2);
    assert_eq!(metrics.blocks.get(), 0);
}

#[tokio::test]
async fn submission_error_does_not_stop_later_chains() {
    let failing = Arc::new(MockChain {
        fail_produce: true,
        ..MockChain::eligible(0, 10)
    });
    let healthy = Arc::new(MockChain::eligible(1, 10));
    let metrics = metrics();
    let producer = producer(
        MockProtocol::new(vec![failing.clone(), healthy.clone()], true),
        Arc::new(MockAccount::new(U256::exp10(18))),
        metrics.clone(),
    );

    assert!(producer.produce_block(addr(USER)).await.unwrap());

    assert_eq!(healthy.produced(), 1);
    assert_eq!(metrics.errors.get(), 1);
    assert_eq!(metrics.blocks.get(), 1);
}

// ============================================================================
// WorkerLifecycle
// ============================================================================

#[tokio::test]
async fn owned_worker_returns_owner_without_transaction() {
    let wm = Arc::new(MockWorkerManager::in_state(WorkerState::Owned));
    let account = Arc::new(MockAccount::new(U256::exp10(18)));
    let lifecycle = lifecycle(wm.clone(), account.clone(), gwei_to_wei(10));

    let outcome = lifecycle.hire().await.unwrap();

    assert_eq!(outcome, HireOutcome::Hired(addr(USER)));
    assert_eq!(wm.accept_calls(), 0);
    assert!(account.transfers().is_empty());
}

#[tokio::test]
async fn pending_worker_accepts_the_job() {
    let wm = Arc::new(MockWorkerManager::in_state(WorkerState::Pending));
    let account = Arc::new(MockAccount::new(U256::exp10(18)));
    let lifecycle = lifecycle(wm.clone(), account.clone(), gwei_to_wei(10));

    let outcome = lifecycle.hire().await.unwrap();

    assert_eq!(outcome, HireOutcome::Hired(addr(USER)));
    assert_eq!(wm.accept_calls(), 1);
    assert_eq!(account.confirmations(), 1);
}

#[tokio::test]
async fn rejected_accept_restarts_hiring_from_a_fresh_state_read() {
    let wm = Arc::new(MockWorkerManager::in_state(WorkerState::Pending).failing_first_accepts(1));
    let account = Arc::new(MockAccount::new(U256::exp10(18)));
    let lifecycle = lifecycle(wm.clone(), account.clone(), gwei_to_wei(10));

    let outcome = lifecycle.hire().await.unwrap();

    assert_eq!(outcome, HireOutcome::Hired(addr(USER)));
    assert_eq!(wm.accept_calls(), 2);
    assert_eq!(wm.ownership_reads(), 2);
    assert_eq!(account.confirmations(), 1);
}

#[tokio::test]
async fn hung_accept_is_timed_out_and_retried() {
    let wm = Arc::new(MockWorkerManager::in_state(WorkerState::Pending).hanging_first_accepts(1));
    let account = Arc::new(MockAccount::new(U256::exp10(18)));
    let lifecycle = WorkerLifecycle::new(
        wm.clone(),
        account.clone(),
        Arc::new(StaticFeeSource::new(gwei_to_wei(10), 1)),
        Arc::new(MockOwnerLookup {
            owner: addr(POOL_OWNER),
        }),
        fast_confirmation(),
        Duration::from_millis(5),
        RetryPolicy::unbounded_fixed(Duration::from_millis(5), Some(Duration::from_millis(100))),
    );

    let outcome = tokio::time::timeout(Duration::from_secs(5), lifecycle.hire())
        .await
        .expect("hiring should recover from the hung attempt")
        .unwrap();

    assert_eq!(outcome, HireOutcome::Hired(addr(USER)));
    assert_eq!(wm.accept_calls(), 2);
    assert_eq!(wm.ownership_reads(), 2);
}

#[tokio::test]
async fn available_worker_polls_until_pending() {
    let wm = Arc::new(MockWorkerManager::with_script(&[
        WorkerState::Available,
        WorkerState::Available,
        WorkerState::Available,
        WorkerState::Pending,
    ]));
    let lifecycle = lifecycle(wm.clone(), Arc::new(MockAccount::new(U256::one())), gwei_to_wei(1));

    let outcome = lifecycle.hire().await.unwrap();

    assert_eq!(outcome, HireOutcome::Hired(addr(USER)));
    assert_eq!(wm.accept_calls(), 1);
}

#[tokio::test]
async fn state_reads_follow_the_worker_manager() {
    for state in [
        WorkerState::Available,
        WorkerState::Pending,
        WorkerState::Owned,
        WorkerState::Retired,
    ] {
        let wm = Arc::new(MockWorkerManager::in_state(state));
        let lifecycle = lifecycle(wm, Arc::new(MockAccount::new(U256::one())), gwei_to_wei(1));
        assert_eq!(lifecycle.state().await.unwrap(), state);
    }
}

#[tokio::test]
async fn retired_with_zero_balance_settles_without_transfer() {
    let wm = Arc::new(MockWorkerManager::in_state(WorkerState::Retired));
    let account = Arc::new(MockAccount::new(U256::zero()));
    let lifecycle = lifecycle(wm, account.clone(), gwei_to_wei(10));

    assert!(lifecycle.retire(addr(USER)).await.unwrap());
    assert!(account.transfers().is_empty());
}

#[tokio::test]
async fn retired_with_balance_transfers_balance_minus_fee_once() {
    let wm = Arc::new(MockWorkerManager::in_state(WorkerState::Retired));
    let balance = U256::exp10(18);
    let account = Arc::new(MockAccount::new(balance));
    let gas_price = gwei_to_wei(10);
    let lifecycle = lifecycle(wm, account.clone(), gas_price);

    assert!(lifecycle.retire(addr(USER)).await.unwrap());

    let transfers = account.transfers();
    assert_eq!(transfers.len(), 1);
    let (to, value, price, gas) = transfers[0];
    let fee = gas_price * U256::from(21_000u64);
    assert_eq!(to, addr(USER));
    assert_eq!(value, balance - fee);
    assert_eq!(price, gas_price);
    assert_eq!(gas, U256::from(21_000u64));
}

#[tokio::test]
async fn retired_pool_worker_pays_the_pool_owner() {
    let wm = Arc::new(
        MockWorkerManager::in_state(WorkerState::Retired).with_owner(addr(POOL), addr(POOL)),
    );
    let account = Arc::new(MockAccount::new(U256::exp10(18)));
    let lifecycle = lifecycle(wm, account.clone(), gwei_to_wei(10));

    let settlement = lifecycle.settle(addr(POOL)).await.unwrap();

    assert!(matches!(
        settlement,
        Settlement::Transferred { beneficiary, .. } if beneficiary == addr(POOL_OWNER)
    ));
    assert_eq!(account.transfers()[0].0, addr(POOL_OWNER));
}

#[tokio::test]
async fn balance_below_fee_is_left_in_place() {
    let wm = Arc::new(MockWorkerManager::in_state(WorkerState::Retired));
    let account = Arc::new(MockAccount::new(U256::from(1_000u64)));
    let lifecycle = lifecycle(wm, account.clone(), gwei_to_wei(10));

    let settlement = lifecycle.settle(addr(USER)).await.unwrap();

    assert!(matches!(settlement, Settlement::BelowFee { .. }));
    assert!(account.transfers().is_empty());
}

#[tokio::test]
async fn pool_is_detected_by_self_ownership() {
    let wm = Arc::new(MockWorkerManager::in_state(WorkerState::Owned).with_owner(addr(POOL), addr(POOL)));
    let lifecycle = lifecycle(wm, Arc::new(MockAccount::new(U256::one())), gwei_to_wei(1));

    assert!(lifecycle.is_pool(addr(POOL)).await.unwrap());
    assert!(!lifecycle.is_pool(addr(USER)).await.unwrap());
}

#[tokio::test]
async fn hire_on_retired_worker_settles_and_reports_retired() {
    let wm = Arc::new(MockWorkerManager::in_state(WorkerState::Retired));
    let account = Arc::new(MockAccount::new(U256::exp10(18)));
    let lifecycle = lifecycle(wm, account.clone(), gwei_to_wei(10));

    let outcome = lifecycle.hire().await.unwrap();

    assert_eq!(outcome, HireOutcome::Retired(addr(USER)));
    assert_eq!(account.transfers().len(), 1);
}

// ============================================================================
// PoolRebalancer
// ============================================================================

#[tokio::test]
async fn rebalance_is_throttled_to_one_submission() {
    let pool = Arc::new(MockPool::new(PoolAmounts::new(ctsi(10), U256::zero(), U256::zero())));
    let metrics = metrics();
    let rebalancer = rebalancer(pool.clone(), Arc::new(MockAccount::new(U256::one())), metrics.clone());

    assert!(rebalancer.rebalance().await.unwrap());
    assert!(!rebalancer.rebalance().await.unwrap());

    assert_eq!(pool.rebalances(), 1);
    assert_eq!(metrics.rebalances.get(), 1);
    assert!(rebalancer.state().last_rebalance().is_some());
}

#[tokio::test]
async fn empty_queues_are_a_no_op() {
    let pool = Arc::new(MockPool::new(PoolAmounts::default()));
    let rebalancer = rebalancer(pool.clone(), Arc::new(MockAccount::new(U256::one())), metrics());

    assert!(!rebalancer.rebalance().await.unwrap());
    assert_eq!(pool.rebalances(), 0);
    assert!(rebalancer.state().last_rebalance().is_none());
}

#[tokio::test]
async fn failed_confirmation_does_not_advance_the_throttle() {
    let pool = Arc::new(MockPool::new(PoolAmounts::new(ctsi(1), U256::zero(), U256::zero())));
    let account = Arc::new(MockAccount::new(U256::one()));
    account.hang_confirmations();
    let rebalancer = rebalancer(pool.clone(), account, metrics());

    let err = rebalancer.rebalance().await.unwrap_err();

    assert!(err.is_confirmation_timeout());
    assert!(rebalancer.state().last_rebalance().is_none());
}

#[tokio::test]
async fn cycle_runs_only_permitted_phases() {
    let pool = Arc::new(MockPool {
        can_mature: true,
        can_release: false,
        ..MockPool::new(PoolAmounts::new(ctsi(5), U256::zero(), ctsi(3)))
    });
    let rebalancer = rebalancer(pool.clone(), Arc::new(MockAccount::new(U256::one())), metrics());

    assert!(rebalancer.cycle().await.unwrap());

    assert_eq!(pool.rebalances(), 1);
    assert_eq!(pool.maturations.load(Ordering::SeqCst), 1);
    assert_eq!(pool.releases.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rebalance_error_skips_the_cycle_phases() {
    let pool = Arc::new(MockPool {
        can_mature: true,
        can_release: true,
        ..MockPool::new(PoolAmounts::new(ctsi(5), U256::zero(), ctsi(3)))
    });
    let account = Arc::new(MockAccount::new(U256::one()));
    account.hang_confirmations();
    let rebalancer = rebalancer(pool.clone(), account, metrics());

    let err = rebalancer.cycle().await.unwrap_err();

    assert!(err.is_confirmation_timeout());
    assert_eq!(pool.rebalances(), 1);
    assert_eq!(pool.maturations.load(Ordering::SeqCst), 0);
    assert_eq!(pool.releases.load(Ordering::SeqCst), 0);
}

// ============================================================================
// NodeRunner
// ============================================================================

fn runner(
    wm: Arc<MockWorkerManager>,
    account: Arc<MockAccount>,
    protocol: Arc<MockProtocol>,
    metrics: Arc<NodeMetrics>,
    seen: Arc<Mutex<Vec<(Address, bool)>>>,
) -> NodeRunner {
    let factory: ProtocolFactory = Box::new(move |principal, is_pool| -> Arc<dyn ProtocolClient> {
        seen.lock().unwrap().push((principal, is_pool));
        protocol.clone()
    });
    NodeRunner::new(
        lifecycle(wm, account.clone(), gwei_to_wei(10)),
        account,
        factory,
        metrics,
        RunnerSettings {
            polling_interval: Duration::from_millis(5),
            balance_threshold: U256::exp10(17),
            two_phase_cycle: false,
            confirmation: fast_confirmation(),
        },
    )
}

#[tokio::test]
async fn runner_wires_pool_mode_and_iterates() {
    let wm = Arc::new(
        MockWorkerManager::in_state(WorkerState::Owned)
            .with_owner(addr(WORKER), addr(POOL))
            .with_owner(addr(POOL), addr(POOL)),
    );
    let account = Arc::new(MockAccount::new(U256::exp10(16)));
    let chain = Arc::new(MockChain::eligible(0, 42));
    let pool = Arc::new(MockPool::new(PoolAmounts::new(ctsi(1), U256::zero(), U256::zero())));
    let metrics = metrics();
    let protocol = Arc::new(
        MockProtocol::new(vec![chain.clone()], true)
            .with_rebalancer(rebalancer(pool.clone(), account.clone(), metrics.clone())),
    );
    let seen = Arc::new(Mutex::new(Vec::new()));
    let runner = runner(wm, account, protocol, metrics.clone(), seen.clone());

    let Start::Working(session) = runner.start().await.unwrap() else {
        panic!("expected a hired worker");
    };
    assert_eq!(session.principal, addr(POOL));
    assert!(session.is_pool);
    assert_eq!(*seen.lock().unwrap(), vec![(addr(POOL), true)]);

    assert_eq!(runner.iterate(&session).await, Iteration::Continue);
    assert_eq!(runner.iterate(&session).await, Iteration::Continue);

    assert_eq!(chain.produced(), 2);
    assert_eq!(pool.rebalances(), 1);
    assert!((metrics.balance.get() - 0.01).abs() < 1e-9);
}

#[tokio::test]
async fn runner_stops_after_retirement() {
    let wm = Arc::new(MockWorkerManager::in_state(WorkerState::Owned));
    let account = Arc::new(MockAccount::new(U256::exp10(18)));
    let chain = Arc::new(MockChain::unstaked(0));
    let protocol = Arc::new(MockProtocol::new(vec![chain], true));
    let runner = runner(
        wm.clone(),
        account.clone(),
        protocol,
        metrics(),
        Arc::new(Mutex::new(Vec::new())),
    );

    let Start::Working(session) = runner.start().await.unwrap() else {
        panic!("expected a hired worker");
    };
    assert_eq!(runner.iterate(&session).await, Iteration::Continue);

    wm.set(WorkerState::Retired);
    assert_eq!(runner.iterate(&session).await, Iteration::Retired);
    assert_eq!(account.transfers().len(), 1);
}

#[tokio::test]
async fn run_returns_when_hired_worker_is_already_retired() {
    let wm = Arc::new(MockWorkerManager::in_state(WorkerState::Retired));
    let account = Arc::new(MockAccount::new(U256::zero()));
    let protocol = Arc::new(MockProtocol::new(Vec::new(), true));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let runner = runner(wm, account, protocol, metrics(), seen.clone());

    let outcome = runner.run().await.unwrap();

    assert_eq!(outcome, RunOutcome::Retired(addr(USER)));
    assert!(seen.lock().unwrap().is_empty());
}
