// SPDX-FileCopyrightText: 2025 Phoenix R&D GmbH <hello@phnx.im>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// Serializes read-modify-write sequences on the same blob key.
///
/// A key only has an entry while its lock is held or awaited.
#[derive(Debug, Clone, Default)]
pub(crate) struct KeyLocks {
    locks: Arc<LockMap>,
}

impl KeyLocks {
    pub(crate) async fn lock(&self, key: &str) -> KeyGuard {
        // The map guard must be released before awaiting the mutex.
        let mutex = self.locks.entry(key.to_owned()).or_default().clone();
        let guard = mutex.lock_owned().await;
        KeyGuard {
            guard: Some(guard),
            key: key.to_owned(),
            locks: self.locks.clone(),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }
}

#[derive(Debug)]
pub(crate) struct KeyGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    locks: Arc<LockMap>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        // Unlock first, so that nobody can lock a fresh mutex for the key
        // while this one is still held.
        drop(self.guard.take());
        // Only the map refers to the mutex: nobody holds or awaits it. The
        // shard lock keeps `lock` from cloning it in the meantime.
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = KeyLocks::default();
        let guard = locks.lock("debts_ada").await;

        let other = locks.lock("debts_bob");
        tokio::time::timeout(Duration::from_secs(1), other)
            .await
            .expect("different keys do not block each other");

        let same = locks.lock("debts_ada");
        assert!(
            tokio::time::timeout(Duration::from_millis(50), same)
                .await
                .is_err()
        );
        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), locks.lock("debts_ada"))
            .await
            .expect("lock is free again");
    }

    #[tokio::test]
    async fn unused_keys_are_forgotten() {
        let locks = KeyLocks::default();
        for user in ["ada", "bob", "eve"] {
            let _guard = locks.lock(&format!("transactions_{user}")).await;
        }
        assert_eq!(locks.len(), 0);

        let guard = locks.lock("debts_ada").await;
        let waiter = tokio::spawn({
            let locks = locks.clone();
            async move {
                let _guard = locks.lock("debts_ada").await;
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);
        // The waiting task still uses the entry.
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter gets the lock")
            .unwrap();
        assert_eq!(locks.len(), 0);
    }
}
