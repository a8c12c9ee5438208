//! # Worker State
//!
//! Worker lifecycle state as reported by the on-chain worker manager.
//!
//! The node keeps no state of its own: every [`WorkerState`] value is derived
//! from a fresh read of the worker manager contract.
//!
//! # Examples
//!
//! ```
//! use pos_node::domain::value_objects::worker_state::WorkerState;
//!
//! assert_eq!(WorkerState::Pending.to_string(), "PENDING");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerState {
    /// Worker is free to be hired by any principal.
    Available,
    /// A principal has requested the worker; the worker must accept the job.
    Pending,
    /// Worker is hired and acts for its owner.
    Owned,
    /// Worker was retired by its owner.
    Retired,
}

impl WorkerState {
    /// Returns the state name as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Pending => "PENDING",
            Self::Owned => "OWNED",
            Self::Retired => "RETIRED",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
