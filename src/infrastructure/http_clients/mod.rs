//! # HTTP Clients
//!
//! Clients for off-chain HTTP services.

pub mod gas_station;

pub use gas_station::{
    DEFAULT_GAS_STATION_TIMEOUT, DEFAULT_GAS_STATION_URL, GasStationClient, GasStationConfig,
};
