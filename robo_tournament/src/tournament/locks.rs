//! Per-bracket serialization of mutating operations.

use super::models::Bracket;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of one async mutex per bracket
#[derive(Debug, Default)]
pub struct BracketLocks {
    locks: Mutex<HashMap<Bracket, Arc<AsyncMutex<()>>>>,
}

impl BracketLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `bracket`
    ///
    /// The guard releases the bracket when dropped.
    pub async fn acquire(&self, bracket: Bracket) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(bracket).or_default())
        };
        lock.lock_owned().await
    }

}
