//! # Worker Manager Adapter
//!
//! [`WorkerManager`] port over the worker auth-manager contract, bound to
//! this node's address.

use crate::application::error::{NodeError, NodeResult};
use crate::application::ports::{NodeAccount, WorkerManager};
use crate::application::services::TransactionManager;
use crate::infrastructure::blockchain::client::{EthClient, SignerClient};
use crate::infrastructure::blockchain::contracts::WorkerAuthManager;
use async_trait::async_trait;
use ethers::types::{Address, TxHash};
use std::fmt;
use std::sync::Arc;

/// Worker manager client.
pub struct WorkerManagerClient {
    worker: Address,
    client: Arc<EthClient>,
    contract: WorkerAuthManager<SignerClient>,
    tx_manager: TransactionManager,
}

impl fmt::Debug for WorkerManagerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerManagerClient")
            .field("worker", &self.worker)
            .field("address", &self.contract.address())
            .finish_non_exhaustive()
    }
}

impl WorkerManagerClient {
    /// Creates a client for the contract at `address`.
    #[must_use]
    pub fn new(client: Arc<EthClient>, address: Address, tx_manager: TransactionManager) -> Self {
        Self {
            worker: client.address(),
            contract: WorkerAuthManager::new(address, client.inner()),
            client,
            tx_manager,
        }
    }

    fn read_error(&self, function: &str, err: impl fmt::Display) -> NodeError {
        NodeError::chain(format!("WorkerManager.{function}({:?}) failed: {err}", self.worker))
    }
}

#[async_trait]
impl WorkerManager for WorkerManagerClient {
    async fn is_owned(&self) -> NodeResult<bool> {
        self.contract
            .is_owned(self.worker)
            .call()
            .await
            .map_err(|e| self.read_error("isOwned", e))
    }

    async fn is_available(&self) -> NodeResult<bool> {
        self.contract
            .is_available(self.worker)
            .call()
            .await
            .map_err(|e| self.read_error("isAvailable", e))
    }

    async fn is_pending(&self) -> NodeResult<bool> {
        self.contract
            .is_pending(self.worker)
            .call()
            .await
            .map_err(|e| self.read_error("isPending", e))
    }

    async fn is_retired(&self) -> NodeResult<bool> {
        self.contract
            .is_retired(self.worker)
            .call()
            .await
            .map_err(|e| self.read_error("isRetired", e))
    }

    async fn get_owner(&self, worker: Address) -> NodeResult<Address> {
        self.contract
            .get_owner(worker)
            .call()
            .await
            .map_err(|e| self.read_error("getOwner", e))
    }

    async fn get_user(&self) -> NodeResult<Address> {
        self.contract
            .get_user(self.worker)
            .call()
            .await
            .map_err(|e| self.read_error("getUser", e))
    }

    async fn accept_job(&self) -> NodeResult<TxHash> {
        self.client
            .send_call(self.contract.accept_job(), &self.tx_manager, "WorkerManager.acceptJob")
            .await
    }
}
