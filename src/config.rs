//! # Configuration
//!
//! Node configuration loading and management.
//!
//! # Configuration Sources
//!
//! Configuration is loaded in the following order (later sources override earlier):
//! 1. Default values
//! 2. Configuration file (if exists)
//! 3. Environment variables (prefixed with `POS_NODE_`)
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `POS_NODE_CONFIG_FILE` | Configuration file path | `config.toml` |
//! | `POS_NODE_RPC_URL` | JSON-RPC endpoint | `http://localhost:8545` |
//! | `POS_NODE_PRIVATE_KEY` | Worker private key (hex) | none |
//! | `POS_NODE_POS_ADDRESS` | PoS contract address | none |
//! | `POS_NODE_WORKER_MANAGER_ADDRESS` | Worker manager address | none |
//! | `POS_NODE_CONFIRMATIONS` | Confirmations to wait for | `1` |
//! | `POS_NODE_GAS_PRICE_PROVIDER` | Gas price strategy | `eth-provider` |
//! | `POS_NODE_GAS_PRICE_MULTIPLIER` | Node price multiplier (%) | `160` |
//! | `POS_NODE_GAS_LIMIT_MULTIPLIER` | Gas limit headroom (%) | `160` |
//! | `POS_NODE_MAX_GAS_PRICE_GWEI` | Spike protection ceiling | `500` |
//! | `POS_NODE_GAS_STATION_ENABLED` | Allow the gas oracle | `false` |
//! | `POS_NODE_GAS_STATION_URL` | Gas oracle URL | ETH Gas Station |
//! | `POS_NODE_GAS_STATION_API_KEY` | Gas oracle API key | none |
//! | `POS_NODE_POLLING_INTERVAL_SECS` | Main loop interval | `30` |
//! | `POS_NODE_REBALANCE_INTERVAL_MINS` | Minimum time between rebalances | `60` |
//! | `POS_NODE_TWO_PHASE_CYCLE` | Use the two-phase pool cycle | `false` |
//! | `POS_NODE_LOG_LEVEL` | Log level | `info` |
//! | `POS_NODE_LOG_FORMAT` | Log format (json/pretty) | `json` |
//!
//! # Examples
//!
//! ```ignore
//! use pos_node::config::NodeConfig;
//!
//! let config = NodeConfig::load()?;
//! config.validate()?;
//! println!("rpc: {}", config.chain.rpc_url);
//! ```

use crate::application::services::gas_price::{GasPriceProviderType, GasPriceSettings, OracleProfile};
use crate::application::services::{ConfirmationPolicy, DEFAULT_GAS_LIMIT_MULTIPLIER, RetryPolicy};
use crate::application::use_cases::RunnerSettings;
use crate::infrastructure::http_clients::{DEFAULT_GAS_STATION_URL, GasStationConfig};
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse configuration.
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// Invalid configuration value.
    #[error("invalid config value for {field}: {message}")]
    InvalidValue {
        /// Field name.
        field: String,
        /// Error message.
        message: String,
    },
}

impl ConfigError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Chain Configuration
// ============================================================================

/// Connection and confirmation settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Worker private key, hex encoded.
    #[serde(default)]
    pub private_key: String,

    /// PoS contract address.
    #[serde(default)]
    pub pos_address: Address,

    /// Worker manager contract address.
    #[serde(default)]
    pub worker_manager_address: Address,

    /// Confirmations to wait for on every transaction.
    #[serde(default = "default_confirmations")]
    pub confirmations: usize,

    /// Confirmation timeout in seconds.
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,

    /// Delay between connection and hiring attempts, in seconds.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,

    /// Per-attempt timeout for connection and hiring, in seconds.
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,

    /// Receipt polling interval in milliseconds.
    #[serde(default = "default_receipt_poll_interval")]
    pub receipt_poll_interval_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            private_key: String::new(),
            pos_address: Address::zero(),
            worker_manager_address: Address::zero(),
            confirmations: default_confirmations(),
            confirmation_timeout_secs: default_confirmation_timeout(),
            retry_interval_secs: default_retry_interval(),
            attempt_timeout_secs: default_attempt_timeout(),
            receipt_poll_interval_ms: default_receipt_poll_interval(),
        }
    }
}

impl fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainConfig")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("pos_address", &self.pos_address)
            .field("worker_manager_address", &self.worker_manager_address)
            .field("confirmations", &self.confirmations)
            .field("confirmation_timeout_secs", &self.confirmation_timeout_secs)
            .field("retry_interval_secs", &self.retry_interval_secs)
            .field("attempt_timeout_secs", &self.attempt_timeout_secs)
            .field("receipt_poll_interval_ms", &self.receipt_poll_interval_ms)
            .finish()
    }
}

impl ChainConfig {
    /// Confirmation count and timeout.
    #[must_use]
    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy::new(
            self.confirmations,
            Duration::from_secs(self.confirmation_timeout_secs),
        )
    }

    /// Unbounded fixed-delay retry used for connecting and hiring.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::unbounded_fixed(
            Duration::from_secs(self.retry_interval_secs),
            Some(Duration::from_secs(self.attempt_timeout_secs)),
        )
    }

    /// Receipt polling interval.
    #[must_use]
    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }
}

// ============================================================================
// Gas Configuration
// ============================================================================

/// External gas-oracle settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct GasStationSettings {
    /// Whether the oracle may be used.
    #[serde(default)]
    pub enabled: bool,

    /// Endpoint URL.
    #[serde(default = "default_gas_station_url")]
    pub url: String,

    /// Optional API key.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in milliseconds.
    #[serde(default = "default_gas_station_timeout")]
    pub timeout_ms: u64,

    /// The only network the oracle quotes for.
    #[serde(default = "default_gas_station_chain_id")]
    pub chain_id: u64,
}

impl Default for GasStationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_gas_station_url(),
            api_key: None,
            timeout_ms: default_gas_station_timeout(),
            chain_id: default_gas_station_chain_id(),
        }
    }
}

impl fmt::Debug for GasStationSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GasStationSettings")
            .field("enabled", &self.enabled)
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_ms", &self.timeout_ms)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

/// Gas pricing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    /// Gas price strategy.
    #[serde(default)]
    pub provider: GasPriceProviderType,

    /// Gas limit headroom in percent.
    #[serde(default = "default_gas_limit_multiplier")]
    pub gas_limit_multiplier: u64,

    /// Multiplier applied to the node-suggested price, in percent.
    #[serde(default = "default_gas_price_multiplier")]
    pub gas_price_multiplier: u64,

    /// Prices at or above this many gwei are refused.
    #[serde(default = "default_max_gas_price_gwei")]
    pub max_gas_price_gwei: u64,

    /// External oracle.
    #[serde(default)]
    pub gas_station: GasStationSettings,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            provider: GasPriceProviderType::default(),
            gas_limit_multiplier: default_gas_limit_multiplier(),
            gas_price_multiplier: default_gas_price_multiplier(),
            max_gas_price_gwei: default_max_gas_price_gwei(),
            gas_station: GasStationSettings::default(),
        }
    }
}

impl GasConfig {
    /// Strategy selection inputs.
    #[must_use]
    pub fn price_settings(&self) -> GasPriceSettings {
        GasPriceSettings {
            provider_type: self.provider,
            gas_price_multiplier: self.gas_price_multiplier,
            max_gas_price_gwei: self.max_gas_price_gwei,
            oracle_enabled: self.gas_station.enabled,
            oracle_chain_id: self.gas_station.chain_id,
        }
    }

    /// Oracle client settings for `profile`.
    #[must_use]
    pub fn gas_station_config(&self, profile: OracleProfile) -> GasStationConfig {
        let mut config = GasStationConfig::default()
            .with_url(self.gas_station.url.clone())
            .with_timeout(Duration::from_millis(self.gas_station.timeout_ms))
            .with_profile(profile);
        if let Some(key) = &self.gas_station.api_key {
            config = config.with_key(key.clone());
        }
        config
    }
}

// ============================================================================
// Worker and Pool Configuration
// ============================================================================

/// Main loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Seconds between iterations.
    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,

    /// Balance in wei below which the node asks to be funded.
    #[serde(default = "default_balance_threshold")]
    pub balance_threshold_wei: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            polling_interval_secs: default_polling_interval(),
            balance_threshold_wei: default_balance_threshold(),
        }
    }
}

impl WorkerConfig {
    /// Polling interval.
    #[must_use]
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }
}

/// Staking pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Minimum minutes between rebalances.
    #[serde(default = "default_rebalance_interval")]
    pub rebalance_interval_mins: u64,

    /// Run stake maturation and withdraw release after rebalancing.
    #[serde(default)]
    pub two_phase_cycle: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            rebalance_interval_mins: default_rebalance_interval(),
            two_phase_cycle: false,
        }
    }
}

impl PoolConfig {
    /// Minimum time between rebalances.
    #[must_use]
    pub fn rebalance_interval(&self) -> Duration {
        Duration::from_secs(self.rebalance_interval_mins * 60)
    }
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Log format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (structured logging).
    #[default]
    Json,
    /// Pretty format (human-readable).
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include target (module path) in logs.
    #[serde(default = "default_true")]
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Json,
            include_target: true,
        }
    }
}

// ============================================================================
// Node Configuration
// ============================================================================

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Chain connection.
    #[serde(default)]
    pub chain: ChainConfig,

    /// Gas pricing.
    #[serde(default)]
    pub gas: GasConfig,

    /// Main loop.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Staking pool.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Logging.
    #[serde(default)]
    pub log: LogConfig,
}

impl NodeConfig {
    /// Loads configuration from the optional config file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// an environment override is malformed.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let config_path =
            std::env::var("POS_NODE_CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if Path::new(&config_path).exists() {
            config = Self::from_file(&config_path)?;
        }

        config.apply_env_overrides()?;

        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` on malformed input.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `POS_NODE_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a value that does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Chain
        if let Some(url) = lookup("POS_NODE_RPC_URL") {
            self.chain.rpc_url = url;
        }
        if let Some(key) = lookup("POS_NODE_PRIVATE_KEY") {
            self.chain.private_key = key;
        }
        if let Some(address) = lookup("POS_NODE_POS_ADDRESS") {
            self.chain.pos_address = parse_var("POS_NODE_POS_ADDRESS", &address)?;
        }
        if let Some(address) = lookup("POS_NODE_WORKER_MANAGER_ADDRESS") {
            self.chain.worker_manager_address =
                parse_var("POS_NODE_WORKER_MANAGER_ADDRESS", &address)?;
        }
        if let Some(n) = lookup("POS_NODE_CONFIRMATIONS") {
            self.chain.confirmations = parse_var("POS_NODE_CONFIRMATIONS", &n)?;
        }

        // Gas
        if let Some(provider) = lookup("POS_NODE_GAS_PRICE_PROVIDER") {
            self.gas.provider = provider
                .parse()
                .map_err(|e| ConfigError::invalid("POS_NODE_GAS_PRICE_PROVIDER", format!("{e}")))?;
        }
        if let Some(m) = lookup("POS_NODE_GAS_PRICE_MULTIPLIER") {
            self.gas.gas_price_multiplier = parse_var("POS_NODE_GAS_PRICE_MULTIPLIER", &m)?;
        }
        if let Some(m) = lookup("POS_NODE_GAS_LIMIT_MULTIPLIER") {
            self.gas.gas_limit_multiplier = parse_var("POS_NODE_GAS_LIMIT_MULTIPLIER", &m)?;
        }
        if let Some(max) = lookup("POS_NODE_MAX_GAS_PRICE_GWEI") {
            self.gas.max_gas_price_gwei = parse_var("POS_NODE_MAX_GAS_PRICE_GWEI", &max)?;
        }
        if let Some(enabled) = lookup("POS_NODE_GAS_STATION_ENABLED") {
            self.gas.gas_station.enabled = parse_var("POS_NODE_GAS_STATION_ENABLED", &enabled)?;
        }
        if let Some(url) = lookup("POS_NODE_GAS_STATION_URL") {
            self.gas.gas_station.url = url;
        }
        if let Some(key) = lookup("POS_NODE_GAS_STATION_API_KEY") {
            self.gas.gas_station.api_key = Some(key);
        }

        // Worker and pool
        if let Some(secs) = lookup("POS_NODE_POLLING_INTERVAL_SECS") {
            self.worker.polling_interval_secs = parse_var("POS_NODE_POLLING_INTERVAL_SECS", &secs)?;
        }
        if let Some(mins) = lookup("POS_NODE_REBALANCE_INTERVAL_MINS") {
            self.pool.rebalance_interval_mins =
                parse_var("POS_NODE_REBALANCE_INTERVAL_MINS", &mins)?;
        }
        if let Some(flag) = lookup("POS_NODE_TWO_PHASE_CYCLE") {
            self.pool.two_phase_cycle = parse_var("POS_NODE_TWO_PHASE_CYCLE", &flag)?;
        }

        // Logging
        if let Some(level) = lookup("POS_NODE_LOG_LEVEL") {
            self.log.level = level;
        }
        if let Some(format) = lookup("POS_NODE_LOG_FORMAT") {
            self.log.format = match format.to_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                _ => LogFormat::Json,
            };
        }

        Ok(())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain.rpc_url.trim().is_empty() {
            return Err(ConfigError::invalid("chain.rpc_url", "must not be empty"));
        }
        if self.chain.private_key.trim().is_empty() {
            return Err(ConfigError::invalid("chain.private_key", "must be set"));
        }
        if self.chain.pos_address.is_zero() {
            return Err(ConfigError::invalid("chain.pos_address", "must be set"));
        }
        if self.chain.worker_manager_address.is_zero() {
            return Err(ConfigError::invalid(
                "chain.worker_manager_address",
                "must be set",
            ));
        }
        if self.chain.confirmations == 0 {
            return Err(ConfigError::invalid("chain.confirmations", "must be at least 1"));
        }
        if self.chain.confirmation_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "chain.confirmation_timeout_secs",
                "must be positive",
            ));
        }
        if self.gas.gas_limit_multiplier < 100 {
            return Err(ConfigError::invalid(
                "gas.gas_limit_multiplier",
                "must be at least 100",
            ));
        }
        if self.gas.gas_price_multiplier == 0 {
            return Err(ConfigError::invalid(
                "gas.gas_price_multiplier",
                "must be positive",
            ));
        }
        if self.gas.max_gas_price_gwei == 0 {
            return Err(ConfigError::invalid("gas.max_gas_price_gwei", "must be positive"));
        }
        if self.worker.polling_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "worker.polling_interval_secs",
                "must be positive",
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log.level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid(
                "log.level",
                format!(
                    "invalid log level '{}', must be one of: {:?}",
                    self.log.level, valid_levels
                ),
            ));
        }

        Ok(())
    }

    /// Settings for the node runner.
    #[must_use]
    pub fn runner_settings(&self) -> RunnerSettings {
        RunnerSettings {
            polling_interval: self.worker.polling_interval(),
            balance_threshold: U256::from(self.worker.balance_threshold_wei),
            two_phase_cycle: self.pool.two_phase_cycle,
            confirmation: self.chain.confirmation_policy(),
        }
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ConfigError::invalid(name, format!("'{raw}': {e}")))
}

// ============================================================================
// Default Value Functions
// ============================================================================

fn default_rpc_url() -> String {
    "http://localhost:8545".to_string()
}

fn default_confirmations() -> usize {
    1
}

fn default_confirmation_timeout() -> u64 {
    10 * 60
}

fn default_retry_interval() -> u64 {
    10
}

fn default_attempt_timeout() -> u64 {
    24 * 60 * 60
}

fn default_receipt_poll_interval() -> u64 {
    4000
}

fn default_gas_limit_multiplier() -> u64 {
    DEFAULT_GAS_LIMIT_MULTIPLIER
}

fn default_gas_price_multiplier() -> u64 {
    160
}

fn default_max_gas_price_gwei() -> u64 {
    500
}

fn default_gas_station_url() -> String {
    DEFAULT_GAS_STATION_URL.to_string()
}

fn default_gas_station_timeout() -> u64 {
    10_000
}

fn default_gas_station_chain_id() -> u64 {
    1
}

fn default_polling_interval() -> u64 {
    30
}

fn default_balance_threshold() -> u64 {
    50_000_000_000_000_000
}

fn default_rebalance_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
