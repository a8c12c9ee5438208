//! # Chain Registry
//!
//! Read-through arena of [`ChainClient`]s indexed by chain index.
//!
//! Chains are created on first access and never evicted. Asking for index
//! `i` creates every missing index below it first, in order, so the arena is
//! always a contiguous prefix `0..len`.

use crate::application::ports::ChainClient;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

type ChainFactory = Box<dyn Fn(usize) -> Arc<dyn ChainClient> + Send + Sync>;

/// Lazily populated chain arena.
pub struct ChainRegistry {
    chains: RwLock<Vec<Arc<dyn ChainClient>>>,
    factory: ChainFactory,
}

impl fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl ChainRegistry {
    /// Creates an empty registry using `factory` to build chain `i`.
    #[must_use]
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(usize) -> Arc<dyn ChainClient> + Send + Sync + 'static,
    {
        Self {
            chains: RwLock::new(Vec::new()),
            factory: Box::new(factory),
        }
    }

    /// Returns chain `index`, creating it (and every lower index) if needed.
    #[must_use]
    pub fn get(&self, index: usize) -> Arc<dyn ChainClient> {
        if let Some(chain) = self.read_chains().get(index) {
            return Arc::clone(chain);
        }

        let mut chains = self.write_chains();
        while chains.len() <= index {
            let next = chains.len();
            chains.push((self.factory)(next));
        }
        Arc::clone(&chains[index])
    }

    /// Number of chains created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_chains().len()
    }

    /// Returns true if no chain was created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the arena lock, recovering from poison if needed.
    fn read_chains(&self) -> RwLockReadGuard<'_, Vec<Arc<dyn ChainClient>>> {
        self.chains.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes the arena lock, recovering from poison if needed.
    fn write_chains(&self) -> RwLockWriteGuard<'_, Vec<Arc<dyn ChainClient>>> {
        self.chains.write().unwrap_or_else(PoisonError::into_inner)
    }
}
