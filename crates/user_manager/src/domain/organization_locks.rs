use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async mutexes keyed by organization id.
///
/// Holding the guard returned by [`OrganizationLocks::lock`] excludes every
/// other holder for the same organization; different organizations never
/// contend. Entries are held weakly and pruned once no guard or waiter
/// references them.
#[derive(Debug, Default)]
pub struct OrganizationLocks {
    locks: Mutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl OrganizationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `organization_id`
    pub async fn lock(&self, organization_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| lock.strong_count() > 0);

            match locks.get(organization_id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(Mutex::new(()));
                    locks.insert(organization_id.to_string(), Arc::downgrade(&lock));
                    lock
                }
            }
        };

        lock.lock_owned().await
    }

    /// Number of organizations with a live lock
    pub async fn active(&self) -> usize {
        let locks = self.locks.lock().await;
        locks.values().filter(|lock| lock.strong_count() > 0).count()
    }
}
