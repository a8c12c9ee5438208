//! # PoS Worker Node
//!
//! Main entry point for the worker node.

use anyhow::Context;
use pos_node::application::NodeError;
use pos_node::application::ports::{FeeSource, NodeAccount, OwnerLookup, ProtocolClient};
use pos_node::application::services::{
    GasPriceProvider, OracleProfile, TransactionManager, create_gas_price_provider, execute_with_retry,
};
use pos_node::application::use_cases::{
    NodeRunner, PoolRebalancer, ProtocolFactory, RunOutcome, WorkerLifecycle,
};
use pos_node::config::{LogConfig, LogFormat, NodeConfig};
use pos_node::infrastructure::blockchain::{
    EthClient, PoolClient, PosProtocol, ProductionRoute, WorkerManagerClient,
};
use pos_node::infrastructure::http_clients::GasStationClient;
use pos_node::infrastructure::monitoring::NodeMetrics;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log.level.to_lowercase()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(log.include_target);

    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = NodeConfig::load().context("failed to load configuration")?;
    init_tracing(&config.log);
    config.validate().context("invalid configuration")?;

    info!("Starting PoS worker node v{}", env!("CARGO_PKG_VERSION"));

    let metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);

    let retry = config.chain.retry_policy();
    let client = execute_with_retry(&retry, "connect", || {
        EthClient::connect(
            &config.chain.rpc_url,
            &config.chain.private_key,
            config.chain.receipt_poll_interval(),
        )
    })
    .await
    .map_err(NodeError::from)
    .context("failed to connect to the chain")?;
    let client = Arc::new(client);

    let station = GasStationClient::new(config.gas.gas_station_config(OracleProfile::Fast))?;
    let fee_source: Arc<dyn FeeSource> = Arc::clone(&client) as Arc<dyn FeeSource>;
    let gas_price_provider =
        create_gas_price_provider(Arc::clone(&fee_source), &config.gas.price_settings(), |profile| {
            Arc::new(station.for_profile(profile)) as Arc<dyn GasPriceProvider>
        })
        .await?;
    let tx_manager = TransactionManager::new(gas_price_provider, config.gas.gas_limit_multiplier);

    let account: Arc<dyn NodeAccount> = Arc::clone(&client) as Arc<dyn NodeAccount>;
    let owner_lookup: Arc<dyn OwnerLookup> = Arc::clone(&client) as Arc<dyn OwnerLookup>;
    let worker_manager = Arc::new(WorkerManagerClient::new(
        Arc::clone(&client),
        config.chain.worker_manager_address,
        tx_manager.clone(),
    ));

    let confirmation = config.chain.confirmation_policy();
    let lifecycle = WorkerLifecycle::new(
        worker_manager,
        Arc::clone(&account),
        fee_source,
        owner_lookup,
        confirmation,
        config.worker.polling_interval(),
        retry,
    );

    let protocol_factory: ProtocolFactory = {
        let client = Arc::clone(&client);
        let account = Arc::clone(&account);
        let metrics = Arc::clone(&metrics);
        let pos_address = config.chain.pos_address;
        let worker_manager_address = config.chain.worker_manager_address;
        let rebalance_interval = config.pool.rebalance_interval();
        Box::new(move |principal, is_pool| -> Arc<dyn ProtocolClient> {
            let (route, rebalancer) = if is_pool {
                let pool = Arc::new(PoolClient::new(
                    Arc::clone(&client),
                    principal,
                    tx_manager.clone(),
                ));
                let rebalancer = PoolRebalancer::new(
                    pool,
                    Arc::clone(&account),
                    confirmation,
                    rebalance_interval,
                    Arc::clone(&metrics),
                );
                (ProductionRoute::Pool(principal), Some(rebalancer))
            } else {
                (ProductionRoute::Direct, None)
            };
            Arc::new(PosProtocol::new(
                Arc::clone(&client),
                pos_address,
                worker_manager_address,
                route,
                tx_manager.clone(),
                rebalancer,
            ))
        })
    };

    let runner = NodeRunner::new(
        lifecycle,
        account,
        protocol_factory,
        Arc::clone(&metrics),
        config.runner_settings(),
    );

    tokio::select! {
        outcome = runner.run() => {
            let RunOutcome::Retired(principal) = outcome?;
            info!("Worker retired by {:?}, exiting", principal);
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            warn!("Interrupted, shutting down PoS worker node");
        }
    }

    Ok(())
}
