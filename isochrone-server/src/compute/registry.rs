//! Computations currently running.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::domain::{Mode, Strategy};

use super::cancel::CancelToken;

/// What makes two computations the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComputationKey {
    pub mode: Mode,
    pub strategy: Strategy,
    pub station: Option<String>,
}

/// An identical computation is already running.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("computation already in progress for {mode} ({strategy})")]
pub struct AlreadyInProgress {
    pub mode: Mode,
    pub strategy: Strategy,
}

/// Registry of running computations, each with its cancellation token.
///
/// Clones share the registry.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    running: Arc<Mutex<HashMap<ComputationKey, CancelToken>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ComputationKey, CancelToken>> {
        // The map holds no invariants a panicking holder could break.
        self.running.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `key`, or fail if it is already running.
    ///
    /// The registration lasts until the returned guard is dropped.
    pub fn begin(
        &self,
        key: ComputationKey,
        token: CancelToken,
    ) -> Result<InFlightGuard, AlreadyInProgress> {
        let mut running = self.lock();
        if running.contains_key(&key) {
            return Err(AlreadyInProgress {
                mode: key.mode,
                strategy: key.strategy,
            });
        }
        running.insert(key.clone(), token);
        Ok(InFlightGuard {
            registry: self.clone(),
            key,
        })
    }

    /// Cancel the computation running under `key`. Returns whether one was.
    pub fn cancel(&self, key: &ComputationKey) -> bool {
        match self.lock().get(key) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, key: &ComputationKey) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Removes its key from the registry on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    registry: InFlightRegistry,
    key: ComputationKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(station: Option<&str>) -> ComputationKey {
        ComputationKey {
            mode: Mode::Walk,
            strategy: if station.is_some() { Strategy::Point } else { Strategy::Network },
            station: station.map(str::to_string),
        }
    }

    #[test]
    fn duplicate_rejected_until_guard_dropped() {
        let registry = InFlightRegistry::new();
        let guard = registry.begin(key(None), CancelToken::new()).unwrap();

        let err = registry.begin(key(None), CancelToken::new()).unwrap_err();
        assert_eq!(err.to_string(), "computation already in progress for walk (network)");
        assert!(registry.begin(key(Some("Zürich HB")), CancelToken::new()).is_ok());

        drop(guard);
        assert!(!registry.is_running(&key(None)));
        assert!(registry.begin(key(None), CancelToken::new()).is_ok());
    }

    #[test]
    fn cancel_reaches_running_token() {
        let registry = InFlightRegistry::new();
        let token = CancelToken::new();
        let _guard = registry.begin(key(Some("Bern")), token.clone()).unwrap();

        assert!(!registry.cancel(&key(Some("Zürich HB"))));
        assert!(registry.cancel(&key(Some("Bern"))));
        assert!(token.is_cancelled());
    }
}
