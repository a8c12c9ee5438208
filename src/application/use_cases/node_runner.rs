//! # Node Runner
//!
//! The node's main loop.
//!
//! 1. Hire (unbounded retry). A worker found retired settles and stops.
//! 2. Detect whether the principal is a pool and wire the protocol client.
//! 3. Every polling interval:
//!    - poll retirement (settle and stop when retired)
//!    - refresh the balance gauge, warn below the funding threshold
//!    - run one production pass
//!    - run the pool rebalance, or the two-phase cycle
//!
//! Failures inside an iteration are logged, counted and never end the loop.

use crate::application::error::NodeResult;
use crate::application::ports::{NodeAccount, ProtocolClient};
use crate::application::services::ConfirmationPolicy;
use crate::application::use_cases::produce_block::BlockProducer;
use crate::application::use_cases::worker_lifecycle::{HireOutcome, WorkerLifecycle};
use crate::infrastructure::monitoring::NodeMetrics;
use ethers::types::{Address, U256};
use ethers::utils::format_ether;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Builds the protocol client for a principal; the flag is true for pools.
pub type ProtocolFactory = Box<dyn Fn(Address, bool) -> Arc<dyn ProtocolClient> + Send + Sync>;

/// Loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Sleep between iterations.
    pub polling_interval: Duration,
    /// Balance below which the node asks to be funded.
    pub balance_threshold: U256,
    /// Use the two-phase pool cycle instead of a plain rebalance.
    pub two_phase_cycle: bool,
    /// Confirmation count and timeout for production transactions.
    pub confirmation: ConfirmationPolicy,
}

/// A hired node ready to iterate.
#[derive(Debug)]
pub struct Session {
    /// Principal the node works for.
    pub principal: Address,
    /// True if the principal is a staking pool.
    pub is_pool: bool,
    protocol: Arc<dyn ProtocolClient>,
    producer: BlockProducer,
}

/// Whether the loop continues after an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    /// Keep polling.
    Continue,
    /// The worker was retired; stop.
    Retired,
}

/// Result of hiring and wiring.
#[derive(Debug)]
pub enum Start {
    /// Hired; ready to iterate.
    Working(Session),
    /// Found retired during hiring; funds were handled.
    Retired(Address),
}

/// Why the runner stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Retired by `principal`; residual funds were handled.
    Retired(Address),
}

/// Drives hiring, production and rebalancing.
pub struct NodeRunner {
    lifecycle: WorkerLifecycle,
    account: Arc<dyn NodeAccount>,
    protocol_factory: ProtocolFactory,
    metrics: Arc<NodeMetrics>,
    settings: RunnerSettings,
}

impl fmt::Debug for NodeRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRunner")
            .field("lifecycle", &self.lifecycle)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl NodeRunner {
    /// Creates a runner.
    #[must_use]
    pub fn new(
        lifecycle: WorkerLifecycle,
        account: Arc<dyn NodeAccount>,
        protocol_factory: ProtocolFactory,
        metrics: Arc<NodeMetrics>,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            lifecycle,
            account,
            protocol_factory,
            metrics,
            settings,
        }
    }

    /// Runs until the worker is retired.
    ///
    /// # Errors
    ///
    /// Returns an error only if hiring or pool detection fails permanently.
    pub async fn run(&self) -> NodeResult<RunOutcome> {
        let session = match self.start().await? {
            Start::Working(session) => session,
            Start::Retired(principal) => return Ok(RunOutcome::Retired(principal)),
        };

        loop {
            if self.iterate(&session).await == Iteration::Retired {
                info!("[{:?}] retired, stopping", self.account.address());
                return Ok(RunOutcome::Retired(session.principal));
            }
            sleep(self.settings.polling_interval).await;
        }
    }

    /// Hires the node and wires the protocol client.
    ///
    /// # Errors
    ///
    /// Returns an error if hiring or pool detection fails.
    pub async fn start(&self) -> NodeResult<Start> {
        let principal = match self.lifecycle.hire().await? {
            HireOutcome::Hired(principal) => principal,
            HireOutcome::Retired(principal) => return Ok(Start::Retired(principal)),
        };

        let is_pool = self.lifecycle.is_pool(principal).await?;
        info!(
            "[{:?}] working for {} {:?}",
            self.account.address(),
            if is_pool { "pool" } else { "user" },
            principal
        );

        let protocol = (self.protocol_factory)(principal, is_pool);
        let producer = BlockProducer::new(
            Arc::clone(&protocol),
            Arc::clone(&self.account),
            self.settings.confirmation,
            Arc::clone(&self.metrics),
        );

        Ok(Start::Working(Session {
            principal,
            is_pool,
            protocol,
            producer,
        }))
    }

    /// Runs one iteration of the loop.
    pub async fn iterate(&self, session: &Session) -> Iteration {
        let worker = self.account.address();

        match self.lifecycle.retire(session.principal).await {
            Ok(true) => return Iteration::Retired,
            Ok(false) => {}
            Err(e) => self.record_error("retirement check failed", &e),
        }

        match self.account.balance().await {
            Ok(balance) => {
                self.metrics.set_balance(balance);
                if balance < self.settings.balance_threshold {
                    warn!(
                        "[{:?}] balance of {} ETH is below {} ETH, please fund the node",
                        worker,
                        format_ether(balance),
                        format_ether(self.settings.balance_threshold)
                    );
                }
            }
            Err(e) => self.record_error("balance read failed", &e),
        }

        if let Err(e) = session.producer.produce_block(session.principal).await {
            self.record_error("block production failed", &e);
        }

        let pool_result = if self.settings.two_phase_cycle {
            session.protocol.cycle().await
        } else {
            session.protocol.rebalance().await
        };
        if let Err(e) = pool_result {
            self.record_error("pool maintenance failed", &e);
        }

        Iteration::Continue
    }

    fn record_error(&self, context: &str, err: &dyn std::error::Error) {
        error!(error = %err, "[{:?}] {}", self.account.address(), context);
        self.metrics.errors.inc();
    }
}
