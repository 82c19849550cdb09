// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user mutual exclusion.
//!
//! The registry maps a user id to a fair async mutex created on first use.
//! The outer map is guarded by a short synchronous critical section that is
//! only held for lookup, insert, and removal; it is never held across an
//! `.await`. The registry, not the caller, owns the held guard, and a
//! [`Lease`] releases it on drop (including while unwinding from a panic).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OwnedMutexGuard;
use tracing::trace;
use uuid::Uuid;
use warden_core::LockError;

struct Slot {
    mutex: Arc<tokio::sync::Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

#[derive(Default)]
struct Inner {
    slots: Mutex<HashMap<Uuid, Slot>>,
}

/// Cleans up after an `acquire` future dropped while still queued.
///
/// Declared before the pending lock future, so that future (and its handle
/// on the mutex) is gone by the time this runs.
struct Waiter<'a> {
    registry: &'a LockRegistry,
    user_id: Uuid,
    armed: bool,
}

impl Waiter<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut slots = self.registry.slots();
            LockRegistry::forget_idle(&mut slots, self.user_id);
            trace!(user_id = %self.user_id, "waiter gave up");
        }
    }
}

/// Issues exclusive per-user leases. Cheap to clone.
#[derive(Clone, Default)]
pub struct LockRegistry {
    inner: Arc<Inner>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<Uuid, Slot>> {
        // The map stays consistent even if a holder panicked mid-update:
        // every mutation is a single insert or remove.
        self.inner.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits until `user_id` is exclusively held by the returned lease.
    ///
    /// Waiters are served in FIFO order. Dropping the future while waiting
    /// gives up the place in the queue, and forgets the slot if nobody else
    /// is left on it.
    pub async fn acquire(&self, user_id: Uuid) -> Lease {
        let mutex = {
            let mut slots = self.slots();
            let slot = slots.entry(user_id).or_insert_with(|| Slot {
                mutex: Arc::new(tokio::sync::Mutex::new(())),
                guard: None,
            });
            Arc::clone(&slot.mutex)
        };

        let guard = {
            let waiter = Waiter {
                registry: self,
                user_id,
                armed: true,
            };
            let guard = mutex.lock_owned().await;
            waiter.disarm();
            guard
        };

        let mut slots = self.slots();
        let slot = slots.entry(user_id).or_insert_with(|| Slot {
            mutex: Arc::clone(OwnedMutexGuard::mutex(&guard)),
            guard: None,
        });
        slot.guard = Some(guard);
        trace!(%user_id, "lease acquired");

        Lease {
            registry: self.clone(),
            user_id,
            released: false,
        }
    }

    /// Releases the lease held for `user_id`.
    pub fn release(&self, user_id: Uuid) -> Result<(), LockError> {
        let mut slots = self.slots();
        let guard = slots
            .get_mut(&user_id)
            .and_then(|slot| slot.guard.take())
            .ok_or(LockError::NotHeld(user_id))?;
        drop(guard);
        Self::forget_idle(&mut slots, user_id);
        trace!(%user_id, "lease released");
        Ok(())
    }

    /// Drops the slot once nobody holds or waits for it.
    fn forget_idle(slots: &mut HashMap<Uuid, Slot>, user_id: Uuid) {
        if let Some(slot) = slots.get(&user_id)
            && slot.guard.is_none()
            && Arc::strong_count(&slot.mutex) == 1
        {
            slots.remove(&user_id);
        }
    }

    /// `true` while a lease for `user_id` is outstanding.
    pub fn is_held(&self, user_id: Uuid) -> bool {
        self.slots()
            .get(&user_id)
            .is_some_and(|slot| slot.guard.is_some())
    }

    /// Holder plus waiters currently contending for `user_id`.
    pub fn contenders(&self, user_id: Uuid) -> usize {
        self.slots()
            .get(&user_id)
            .map_or(0, |slot| Arc::strong_count(&slot.mutex) - 1)
    }

    /// Number of users with a live slot.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive processing right for one user.
#[must_use = "the lease is released as soon as it is dropped"]
pub struct Lease {
    registry: LockRegistry,
    user_id: Uuid,
    released: bool,
}

impl Lease {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Releases explicitly, surfacing registry misuse.
    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        self.registry.release(self.user_id)
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if !self.released {
            // Only fails if someone released this user behind our back.
            let _ = self.registry.release(self.user_id);
        }
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("user_id", &self.user_id)
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;
    use warden_core::{RequestContext, WardenError};

    use super::*;

    #[tokio::test]
    async fn release_without_acquire_is_not_held() {
        let registry = LockRegistry::new();
        let user = Uuid::new_v4();
        assert!(matches!(registry.release(user), Err(LockError::NotHeld(id)) if id == user));
    }

    #[tokio::test]
    async fn explicit_release_then_double_release_fails() {
        let registry = LockRegistry::new();
        let user = Uuid::new_v4();
        let lease = registry.acquire(user).await;
        assert!(registry.is_held(user));
        lease.release().unwrap();
        assert!(!registry.is_held(user));
        assert!(registry.release(user).is_err());
        assert!(registry.is_empty(), "idle slots are forgotten");
    }

    #[tokio::test]
    async fn drop_releases_lease() {
        let registry = LockRegistry::new();
        let user = Uuid::new_v4();
        {
            let _lease = registry.acquire(user).await;
            assert_eq!(registry.contenders(user), 1);
        }
        assert!(!registry.is_held(user));
        let _again = registry.acquire(user).await;
    }

    #[tokio::test]
    async fn panic_while_holding_releases_lease() {
        let registry = LockRegistry::new();
        let user = Uuid::new_v4();
        let task_registry = registry.clone();
        let result = tokio::spawn(async move {
            let _lease = task_registry.acquire(user).await;
            panic!("handler blew up");
        })
        .await;
        assert!(result.is_err());
        assert!(!registry.is_held(user));
        tokio::time::timeout(Duration::from_secs(1), registry.acquire(user))
            .await
            .expect("lease must be free after panic");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_user_is_mutually_exclusive() {
        let registry = LockRegistry::new();
        let user = Uuid::new_v4();
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            let active = Arc::clone(&active);
            let max_seen = Arc::clone(&max_seen);
            tasks.push(tokio::spawn(async move {
                let _lease = registry.acquire(user).await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn distinct_users_do_not_serialize() {
        let registry = LockRegistry::new();
        let a = registry.acquire(Uuid::new_v4()).await;
        // Would hang if users shared a mutex.
        let b = tokio::time::timeout(Duration::from_secs(1), registry.acquire(Uuid::new_v4()))
            .await
            .expect("distinct users must not block each other");
        assert_eq!(registry.len(), 2);
        drop((a, b));
    }

    #[tokio::test]
    async fn waiters_are_served_in_arrival_order() {
        let registry = LockRegistry::new();
        let user = Uuid::new_v4();
        let order = Arc::new(Mutex::new(Vec::new()));
        let first = registry.acquire(user).await;

        let mut tasks = Vec::new();
        for n in 0..3 {
            let task_registry = registry.clone();
            let order = Arc::clone(&order);
            tasks.push(tokio::spawn(async move {
                let _lease = task_registry.acquire(user).await;
                order.lock().unwrap().push(n);
            }));
            while registry.contenders(user) < n + 2 {
                tokio::task::yield_now().await;
            }
        }
        drop(first);
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn cancelled_waiter_leaves_queue() {
        let registry = LockRegistry::new();
        let user = Uuid::new_v4();
        let held = registry.acquire(user).await;
        let waited =
            tokio::time::timeout(Duration::from_millis(20), registry.acquire(user)).await;
        assert!(waited.is_err());
        assert_eq!(registry.contenders(user), 1);
        drop(held);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn waiter_cancelled_after_release_leaves_no_slot() {
        let registry = LockRegistry::new();
        let user = Uuid::new_v4();
        let held = registry.acquire(user).await;

        let mut waiting = Box::pin(registry.acquire(user));
        assert!(poll_once(waiting.as_mut()).await.is_none());
        assert_eq!(registry.contenders(user), 2);

        // The holder leaves while the waiter is still queued, then the
        // waiter is abandoned before it is polled again.
        drop(held);
        drop(waiting);

        assert_eq!(registry.contenders(user), 0);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn cancelled_waiter_in_context_leaves_no_slot() {
        let registry = LockRegistry::new();
        let user = Uuid::new_v4();
        let held = registry.acquire(user).await;

        let cancel = CancellationToken::new();
        let ctx = RequestContext::new(cancel.clone());
        let waiting = {
            let registry = registry.clone();
            tokio::spawn(async move { ctx.cancellable(registry.acquire(user)).await.map(|_| ()) })
        };
        while registry.contenders(user) < 2 {
            tokio::task::yield_now().await;
        }
        drop(held);
        cancel.cancel();
        let outcome = waiting.await.unwrap();

        // Either the waiter won the lock before noticing the cancel (and
        // released it on drop) or it gave up; no slot survives either way.
        assert!(outcome.is_ok() || matches!(outcome, Err(WardenError::Canceled)));
        assert!(registry.is_empty());
    }

    /// Polls `fut` exactly once.
    async fn poll_once<F: Future + Unpin>(mut fut: F) -> Option<F::Output> {
        std::future::poll_fn(|cx| {
            std::task::Poll::Ready(match std::pin::Pin::new(&mut fut).poll(cx) {
                std::task::Poll::Ready(out) => Some(out),
                std::task::Poll::Pending => None,
            })
        })
        .await
    }
}
