//! # Ethereum Client
//!
//! Signing JSON-RPC client for the node's account.
//!
//! [`EthClient`] wraps an HTTP provider with the node's local wallet and
//! implements the account-level ports: balance and nonce reads, transfers,
//! confirmation waits, fee data and `owner()` lookups. Contract adapters
//! submit their calls through [`EthClient::send_call`], which prices every
//! transaction with a fresh quote from the [`TransactionManager`].
//!
//! # Examples
//!
//! ```ignore
//! use pos_node::infrastructure::blockchain::EthClient;
//! use std::time::Duration;
//!
//! let client = EthClient::connect("http://localhost:8545", "0x...", Duration::from_millis(100)).await?;
//! println!("worker {:?} on chain {}", client.address(), client.chain_id());
//! ```

use crate::application::error::{NodeError, NodeResult};
use crate::application::ports::{FeeSource, NodeAccount, OwnerLookup};
use crate::application::services::TransactionManager;
use crate::domain::value_objects::{GasPriceQuote, TransactionOverrides, TxReceiptSummary};
use crate::infrastructure::blockchain::contracts::Ownable;
use async_trait::async_trait;
use ethers::abi::Detokenize;
use ethers::contract::ContractCall;
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// HTTP provider type alias.
pub type HttpProvider = Provider<Http>;

/// Provider with the node's wallet attached.
pub type SignerClient = SignerMiddleware<HttpProvider, LocalWallet>;

/// Signing client for the node account.
#[derive(Clone)]
pub struct EthClient {
    inner: Arc<SignerClient>,
    chain_id: u64,
    interval: Duration,
}

impl fmt::Debug for EthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EthClient")
            .field("address", &self.inner.address())
            .field("chain_id", &self.chain_id)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl EthClient {
    /// Connects to `rpc_url` and attaches the wallet for `private_key`.
    ///
    /// # Arguments
    ///
    /// * `rpc_url` - The JSON-RPC endpoint URL.
    /// * `private_key` - Hex-encoded secp256k1 key of the worker.
    /// * `interval` - Polling interval used while waiting for receipts.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Config` for a malformed URL or key and
    /// `NodeError::Chain` if the chain id cannot be read.
    pub async fn connect(rpc_url: &str, private_key: &str, interval: Duration) -> NodeResult<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| NodeError::config(format!("invalid rpc url: {e}")))?
            .interval(interval);

        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| NodeError::chain(format!("failed to get chain id: {e}")))?
            .as_u64();

        let wallet = private_key
            .parse::<LocalWallet>()
            .map_err(|e| NodeError::config(format!("invalid private key: {e}")))?
            .with_chain_id(chain_id);

        info!(chain_id, "connected as worker {:?}", wallet.address());

        Ok(Self {
            inner: Arc::new(SignerMiddleware::new(provider, wallet)),
            chain_id,
            interval,
        })
    }

    /// Returns the signing middleware for contract bindings.
    #[inline]
    #[must_use]
    pub fn inner(&self) -> Arc<SignerClient> {
        Arc::clone(&self.inner)
    }

    /// Returns the network chain id read at connection time.
    #[inline]
    #[must_use]
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Estimates, prices and submits a contract call.
    ///
    /// The gas estimate is scaled by the manager's headroom and the nonce is
    /// pinned to the account's latest transaction count.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Chain` if estimation or submission fails, or the
    /// gas-price provider's error.
    pub async fn send_call<D: Detokenize>(
        &self,
        call: ContractCall<SignerClient, D>,
        tx_manager: &TransactionManager,
        label: &str,
    ) -> NodeResult<TxHash> {
        let estimate = call
            .estimate_gas()
            .await
            .map_err(|e| NodeError::chain(format!("{label}: gas estimation failed: {e}")))?;
        let nonce = self.nonce().await?;
        let overrides = tx_manager.overrides_with_nonce(Some(estimate), nonce).await?;

        let mut tx = call.tx.clone();
        apply_overrides(&mut tx, &overrides);
        debug!(label, gas_price = %overrides.gas_price, "submitting transaction");

        self.submit(tx, label).await
    }

    async fn submit(&self, tx: TypedTransaction, label: &str) -> NodeResult<TxHash> {
        let pending = self
            .inner
            .send_transaction(tx, None)
            .await
            .map_err(|e| NodeError::chain(format!("{label}: submission failed: {e}")))?;
        Ok(pending.tx_hash())
    }
}

/// Sets gas limit, nonce and pricing on `tx`.
///
/// A legacy quote turns the request into a legacy transaction and an
/// EIP-1559 quote into a type-2 transaction; call data, value and
/// addressing are carried over.
pub fn apply_overrides(tx: &mut TypedTransaction, overrides: &TransactionOverrides) {
    if let Some(gas) = overrides.gas_limit {
        tx.set_gas(gas);
    }
    if let Some(nonce) = overrides.nonce {
        tx.set_nonce(nonce);
    }

    match overrides.gas_price {
        GasPriceQuote::Legacy { gas_price } => {
            let legacy = TransactionRequest {
                from: tx.from().copied(),
                to: tx.to().cloned(),
                gas: tx.gas().copied(),
                gas_price: Some(gas_price),
                value: tx.value().copied(),
                data: tx.data().cloned(),
                nonce: tx.nonce().copied(),
                chain_id: tx.chain_id(),
            };
            *tx = TypedTransaction::Legacy(legacy);
        }
        GasPriceQuote::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } => {
            let request = Eip1559TransactionRequest {
                from: tx.from().copied(),
                to: tx.to().cloned(),
                gas: tx.gas().copied(),
                value: tx.value().copied(),
                data: tx.data().cloned(),
                nonce: tx.nonce().copied(),
                access_list: Default::default(),
                max_priority_fee_per_gas: Some(max_priority_fee_per_gas),
                max_fee_per_gas: Some(max_fee_per_gas),
                chain_id: tx.chain_id(),
            };
            *tx = TypedTransaction::Eip1559(request);
        }
    }
}

#[async_trait]
impl NodeAccount for EthClient {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn balance(&self) -> NodeResult<U256> {
        self.inner
            .get_balance(self.inner.address(), None)
            .await
            .map_err(|e| NodeError::chain(format!("failed to get balance: {e}")))
    }

    async fn nonce(&self) -> NodeResult<U256> {
        self.inner
            .get_transaction_count(self.inner.address(), Some(BlockNumber::Latest.into()))
            .await
            .map_err(|e| NodeError::chain(format!("failed to get transaction count: {e}")))
    }

    async fn estimate_transfer_gas(&self, to: Address, value: U256) -> NodeResult<U256> {
        let tx: TypedTransaction = TransactionRequest::new()
            .from(self.inner.address())
            .to(to)
            .value(value)
            .into();
        self.inner
            .estimate_gas(&tx, None)
            .await
            .map_err(|e| NodeError::chain(format!("transfer gas estimation failed: {e}")))
    }

    async fn send_transfer(
        &self,
        to: Address,
        value: U256,
        gas_price: U256,
        gas_limit: U256,
    ) -> NodeResult<TxHash> {
        let tx: TypedTransaction = TransactionRequest::new()
            .from(self.inner.address())
            .to(to)
            .value(value)
            .gas_price(gas_price)
            .gas(gas_limit)
            .into();
        self.submit(tx, "transfer").await
    }

    async fn wait_for_confirmations(
        &self,
        tx_hash: TxHash,
        confirmations: usize,
    ) -> NodeResult<TxReceiptSummary> {
        let receipt = PendingTransaction::new(tx_hash, self.inner.provider())
            .interval(self.interval)
            .confirmations(confirmations)
            .await
            .map_err(|e| NodeError::chain(format!("failed to wait for {tx_hash:?}: {e}")))?
            .ok_or(NodeError::TransactionDropped(tx_hash))?;

        let mut summary = TxReceiptSummary::new(tx_hash);
        summary.gas_used = receipt.gas_used;
        summary.effective_gas_price = receipt.effective_gas_price;
        Ok(summary)
    }
}

#[async_trait]
impl FeeSource for EthClient {
    async fn gas_price(&self) -> NodeResult<U256> {
        self.inner
            .get_gas_price()
            .await
            .map_err(|e| NodeError::chain(format!("failed to get gas price: {e}")))
    }

    async fn fee_history(&self, block_count: u64, percentiles: &[f64]) -> NodeResult<FeeHistory> {
        self.inner
            .fee_history(block_count, BlockNumber::Latest, percentiles)
            .await
            .map_err(|e| NodeError::chain(format!("failed to get fee history: {e}")))
    }

    async fn chain_id(&self) -> NodeResult<u64> {
        Ok(self.chain_id)
    }
}

#[async_trait]
impl OwnerLookup for EthClient {
    async fn owner_of(&self, contract: Address) -> NodeResult<Address> {
        Ownable::new(contract, self.inner())
            .owner()
            .call()
            .await
            .map_err(|e| NodeError::chain(format!("failed to get owner of {contract:?}: {e}")))
    }
}
