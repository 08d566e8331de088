//! Per-user locking so that writes to one user's files never interleave.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, MutexGuard};

use tokio::sync::{Mutex, OwnedMutexGuard};

type Slots = HashMap<String, Arc<Mutex<()>>>;

/// Slots exist only while someone holds or waits on them.
#[derive(Clone, Default)]
pub struct UserLockManager {
    locks: Arc<SyncMutex<Slots>>,
}

impl UserLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wait for exclusive access to `user_id`. Released when the guard drops.
    pub async fn acquire(&self, user_id: &str) -> UserLockGuard {
        let slot = self
            .slots()
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        UserLockGuard {
            guard: Some(slot.lock_owned().await),
            user_id: user_id.to_string(),
            manager: self.clone(),
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.slots().len()
    }
}

pub struct UserLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    user_id: String,
    manager: UserLockManager,
}

impl Drop for UserLockGuard {
    fn drop(&mut self) {
        let mut slots = self.manager.slots();
        // The map and this guard hold the only references: nobody is waiting.
        let idle = slots
            .get(&self.user_id)
            .is_some_and(|slot| Arc::strong_count(slot) == 2);
        self.guard.take();
        if idle {
            slots.remove(&self.user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_user_is_serialized() {
        let manager = UserLockManager::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let counter1 = counter.clone();
        let manager1 = manager.clone();
        let t1 = tokio::spawn(async move {
            let _guard = manager1.acquire("alice").await;
            counter1.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            counter1.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(10)).await;

        let counter2 = counter.clone();
        let manager2 = manager.clone();
        let t2 = tokio::spawn(async move {
            let _guard = manager2.acquire("alice").await;
            assert!(counter2.load(Ordering::SeqCst) >= 2);
            counter2.fetch_add(1, Ordering::SeqCst);
        });

        t1.await.unwrap();
        t2.await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn different_users_run_in_parallel() {
        let manager = UserLockManager::new();
        let _alice = manager.acquire("alice").await;
        let bob = tokio::time::timeout(Duration::from_millis(100), manager.acquire("bob")).await;
        assert!(bob.is_ok());
    }

    #[tokio::test]
    async fn idle_slots_are_evicted() {
        let manager = UserLockManager::new();
        for i in 0..50 {
            let _guard = manager.acquire(&format!("user-{i}")).await;
        }
        assert_eq!(manager.slot_count(), 0);

        let held = manager.acquire("alice").await;
        assert_eq!(manager.slot_count(), 1);
        drop(held);
        assert_eq!(manager.slot_count(), 0);
    }

    #[tokio::test]
    async fn slot_survives_while_someone_waits() {
        let manager = UserLockManager::new();
        let first = manager.acquire("alice").await;

        let waiter_manager = manager.clone();
        let waiter = tokio::spawn(async move {
            let _guard = waiter_manager.acquire("alice").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert_eq!(manager.slot_count(), 1);
        waiter.await.unwrap();
        assert_eq!(manager.slot_count(), 0);
    }
}
