//! # Gas Station Client
//!
//! Gas-price oracle backed by an ETH Gas Station compatible HTTP endpoint.
//!
//! The endpoint returns a JSON object keyed by speed profile (`fast`,
//! `fastest`, `safeLow`, `average`). Prices are published in units of
//! 0.1 gwei and converted to wei by multiplying by `10^8`.
//!
//! # Examples
//!
//! ```ignore
//! use pos_node::infrastructure::http_clients::{GasStationClient, GasStationConfig};
//!
//! let client = GasStationClient::new(GasStationConfig::default().with_key("secret"))?;
//! let quote = client.gas_price().await?;
//! ```

use crate::application::error::{NodeError, NodeResult};
use crate::application::services::gas_price::{GasPriceProvider, OracleProfile};
use crate::domain::value_objects::{GasPriceQuote, WEI_PER_DECIGWEI, format_gwei};
use async_trait::async_trait;
use ethers::types::U256;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error};

/// Default oracle endpoint.
pub const DEFAULT_GAS_STATION_URL: &str = "https://ethgasstation.info/json/ethgasAPI.json";

/// Default request timeout (10 seconds).
pub const DEFAULT_GAS_STATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Oracle endpoint settings.
#[derive(Clone, PartialEq, Eq)]
pub struct GasStationConfig {
    /// Endpoint URL.
    pub url: String,
    /// Optional API key, sent as the `api-key` query parameter.
    pub key: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// Profile to read from the response.
    pub profile: OracleProfile,
}

impl Default for GasStationConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GAS_STATION_URL.to_string(),
            key: None,
            timeout: DEFAULT_GAS_STATION_TIMEOUT,
            profile: OracleProfile::Fast,
        }
    }
}

impl GasStationConfig {
    /// Sets the endpoint URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the profile.
    #[must_use]
    pub fn with_profile(mut self, profile: OracleProfile) -> Self {
        self.profile = profile;
        self
    }
}

impl fmt::Debug for GasStationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GasStationConfig")
            .field("url", &self.url)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("profile", &self.profile)
            .finish()
    }
}

/// Gas Station oracle client.
#[derive(Clone)]
pub struct GasStationClient {
    http: Client,
    config: GasStationConfig,
}

impl fmt::Debug for GasStationClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GasStationClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GasStationClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Config` if the HTTP client cannot be built.
    pub fn new(config: GasStationConfig) -> NodeResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NodeError::config(format!("failed to build gas station client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Returns the same client reading another profile.
    #[must_use]
    pub fn for_profile(&self, profile: OracleProfile) -> Self {
        Self {
            http: self.http.clone(),
            config: self.config.clone().with_profile(profile),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &GasStationConfig {
        &self.config
    }

    async fn request_price(&self) -> NodeResult<u64> {
        let mut request = self.http.get(&self.config.url);
        if let Some(key) = &self.config.key {
            request = request.query(&[("api-key", key)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NodeError::gas_oracle(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| NodeError::gas_oracle(format!("request failed: {e}")))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| NodeError::gas_oracle(format!("invalid response body: {e}")))?;

        let profile = self.config.profile;
        let value = body.get(profile.as_str()).ok_or_else(|| {
            NodeError::gas_oracle(format!("gas station did not return a {profile} price"))
        })?;
        decigwei(value).ok_or_else(|| {
            NodeError::gas_oracle(format!("non-integer {profile} price {value}"))
        })
    }
}

/// Reads a whole decigwei amount. The feed publishes floats such as `1080.0`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn decigwei(value: &serde_json::Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let v = value.as_f64()?;
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v < u64::MAX as f64 {
        return Some(v as u64);
    }
    None
}

#[async_trait]
impl GasPriceProvider for GasStationClient {
    fn name(&self) -> &str {
        "gas-station"
    }

    async fn gas_price(&self) -> NodeResult<GasPriceQuote> {
        match self.request_price().await {
            Ok(decigwei) => {
                let gas_price = U256::from(decigwei) * U256::from(WEI_PER_DECIGWEI);
                debug!(
                    profile = %self.config.profile,
                    "gas station: fetched gas price {} gwei",
                    format_gwei(gas_price)
                );
                Ok(GasPriceQuote::legacy(gas_price))
            }
            Err(e) => {
                error!(error = %e, "gas station: failed to retrieve gas price");
                Err(e)
            }
        }
    }
}
