//! Process-local locks that serialise checkouts per product and per order.
//!
//! A checkout holds the locks for the products in its cart from the stock check until the payment outcome is known.
//! Checkouts of other products, and every other write, carry on without waiting. The conditional stock update in
//! [`super::db::products::take_stock`] still guards against writers in other processes.
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<HoldKey, Arc<AsyncMutex<()>>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HoldKey {
    Order(String),
    Product(i64),
}

/// The lock registry. Clones share the same locks.
#[derive(Debug, Clone, Default)]
pub struct StockHolds {
    locks: Arc<Mutex<LockMap>>,
}

impl StockHolds {
    /// Waits for every lock in `keys`, in the order given.
    ///
    /// To stay deadlock free, callers take order keys before product keys, and product keys in ascending id order.
    pub async fn acquire<I: IntoIterator<Item = HoldKey>>(&self, keys: I) -> Hold {
        let mut hold = Hold { guards: Vec::new(), keys: Vec::new(), locks: Arc::clone(&self.locks) };
        self.extend(&mut hold, keys).await;
        hold
    }

    /// Adds more locks to an existing hold. The same ordering rules apply across both calls.
    pub async fn extend<I: IntoIterator<Item = HoldKey>>(&self, hold: &mut Hold, keys: I) {
        for key in keys {
            if hold.keys.contains(&key) {
                continue;
            }
            let lock = self.lock_for(&key);
            hold.guards.push(lock.lock_owned().await);
            hold.keys.push(key);
        }
    }

    /// The number of keys with a live lock. Locks are forgotten once nobody holds or waits for them.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_for(&self, key: &HoldKey) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }
}

/// A set of acquired locks. They are released when the hold is dropped.
pub struct Hold {
    guards: Vec<OwnedMutexGuard<()>>,
    keys: Vec<HoldKey>,
    locks: Arc<Mutex<LockMap>>,
}

impl Debug for Hold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hold({:?})", self.keys)
    }
}

impl Drop for Hold {
    fn drop(&mut self) {
        self.guards.clear();
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        for key in &self.keys {
            // Only the map itself still points at an idle lock.
            if locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
                locks.remove(key);
            }
        }
    }
}
