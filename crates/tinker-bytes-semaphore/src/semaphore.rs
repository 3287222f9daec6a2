//! A byte-weighted semaphore that permits overdraft.
//!
//! The stock `tokio::sync::Semaphore` cannot represent a negative balance,
//! so the waiter queue here is hand-rolled: a `Mutex`-guarded `VecDeque` of
//! waiter slots, each woken by a plain `Waker` rather than a `oneshot`
//! channel, so a cancelled waiter can remove itself from the queue without
//! ever being charged.

use crate::config::BytesSemaphoreConfig;
use crate::events::BytesSemaphoreEvent;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use std::time::Instant;
use tinker_core::events::EventListeners;

struct WaiterSlot {
    id: u64,
    n: i64,
    woken: AtomicBool,
    waker: Mutex<Option<Waker>>,
}

struct Inner {
    max_bytes: i64,
    current_bytes: i64,
    waiters: VecDeque<Arc<WaiterSlot>>,
    next_id: u64,
}

/// Byte-weighted admission control allowing overdraft: a single oversized
/// request is admitted immediately (so it isn't starved), but any
/// subsequent acquisition blocks, FIFO, until the overdraft is repaid.
///
/// Invariants:
/// 1. `current_bytes <= max_bytes` at rest.
/// 2. acquisition is permitted whenever `current_bytes >= 0`, regardless of
///    whether `n` exceeds `current_bytes` — the balance may go negative.
/// 3. on release, while `current_bytes >= 0`, the oldest waiter is woken and
///    charged, repeating until the queue drains or the balance goes negative.
pub struct BytesSemaphore {
    inner: Mutex<Inner>,
    name: String,
    event_listeners: EventListeners<BytesSemaphoreEvent>,
}

impl BytesSemaphore {
    pub fn new(config: BytesSemaphoreConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                max_bytes: config.max_bytes,
                current_bytes: config.max_bytes,
                waiters: VecDeque::new(),
                next_id: 0,
            }),
            name: config.name,
            event_listeners: config.event_listeners,
        }
    }

    pub fn current_bytes(&self) -> i64 {
        self.inner.lock().expect("bytes semaphore poisoned").current_bytes
    }

    pub fn max_bytes(&self) -> i64 {
        self.inner.lock().expect("bytes semaphore poisoned").max_bytes
    }

    /// Acquire `n` bytes, blocking FIFO if the balance is already negative.
    /// Returns a guard that releases `n` bytes on drop, so the charge is
    /// undone even if the caller panics or the future is cancelled after
    /// acquisition.
    pub async fn acquire(&self, n: i64) -> BytesPermit<'_> {
        let slot = {
            let mut inner = self.inner.lock().expect("bytes semaphore poisoned");
            if inner.current_bytes >= 0 {
                inner.current_bytes -= n;
                self.event_listeners.emit(&BytesSemaphoreEvent::Acquired {
                    pattern_name: self.name.clone(),
                    timestamp: Instant::now(),
                    n,
                    current_bytes: inner.current_bytes,
                });
                None
            } else {
                let id = inner.next_id;
                inner.next_id += 1;
                let slot = Arc::new(WaiterSlot {
                    id,
                    n,
                    woken: AtomicBool::new(false),
                    waker: Mutex::new(None),
                });
                inner.waiters.push_back(slot.clone());
                self.event_listeners.emit(&BytesSemaphoreEvent::Blocked {
                    pattern_name: self.name.clone(),
                    timestamp: Instant::now(),
                    n,
                });
                Some(slot)
            }
        };

        if let Some(slot) = slot {
            AcquireFuture {
                semaphore: self,
                slot,
                completed: false,
            }
            .await;
        }

        BytesPermit {
            semaphore: self,
            n,
        }
    }

    /// Runs `f` with `n` bytes acquired, releasing them on every exit path
    /// (success, error, or panic) — the property-tested invariant that
    /// `current_bytes` after `with_bytes` equals its value before the call.
    pub async fn with_bytes<F, Fut, T>(&self, n: i64, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = self.acquire(n).await;
        f().await
    }

    fn release(&self, n: i64) {
        let mut inner = self.inner.lock().expect("bytes semaphore poisoned");
        inner.current_bytes += n;
        while inner.current_bytes >= 0 {
            let Some(slot) = inner.waiters.front().cloned() else {
                break;
            };
            inner.waiters.pop_front();
            inner.current_bytes -= slot.n;
            slot.woken.store(true, Ordering::Release);
            if let Some(waker) = slot.waker.lock().expect("waiter poisoned").take() {
                waker.wake();
            }
        }
        self.event_listeners.emit(&BytesSemaphoreEvent::Released {
            pattern_name: self.name.clone(),
            timestamp: Instant::now(),
            n,
            current_bytes: inner.current_bytes,
        });
    }

    fn remove_waiter(&self, id: u64) {
        let mut inner = self.inner.lock().expect("bytes semaphore poisoned");
        inner.waiters.retain(|slot| slot.id != id);
    }
}

struct AcquireFuture<'a> {
    semaphore: &'a BytesSemaphore,
    slot: Arc<WaiterSlot>,
    /// Set once `poll` has observed `woken` and returned `Ready`, i.e. the
    /// charge is about to be handed off to a [`BytesPermit`]. Distinguishes
    /// "completed normally" from "dropped after `release` already woke and
    /// charged this waiter, but before the caller ever took the permit" —
    /// both leave `slot.woken == true`, but only the latter must refund.
    completed: bool,
}

impl Future for AcquireFuture<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.slot.woken.load(Ordering::Acquire) {
            self.completed = true;
            return Poll::Ready(());
        }
        *self.slot.waker.lock().expect("waiter poisoned") = Some(cx.waker().clone());
        if self.slot.woken.load(Ordering::Acquire) {
            self.completed = true;
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

impl Drop for AcquireFuture<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        if self.slot.woken.load(Ordering::Acquire) {
            // Woken and charged by `release`, but cancelled before the
            // enclosing `acquire` call ever built a `BytesPermit` to own
            // that charge. Refund it so `current_bytes` doesn't leak.
            self.semaphore.release(self.slot.n);
        } else {
            self.semaphore.remove_waiter(self.slot.id);
        }
    }
}

/// RAII guard returned by [`BytesSemaphore::acquire`]; releases its `n`
/// bytes back to the semaphore when dropped.
pub struct BytesPermit<'a> {
    semaphore: &'a BytesSemaphore,
    n: i64,
}

impl Drop for BytesPermit<'_> {
    fn drop(&mut self) {
        self.semaphore.release(self.n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn semaphore(max_bytes: i64) -> BytesSemaphore {
        BytesSemaphore::new(BytesSemaphoreConfig::builder().max_bytes(max_bytes).build())
    }

    #[tokio::test]
    async fn acquire_within_budget_does_not_go_negative() {
        let sem = semaphore(1024);
        let permit = sem.acquire(100).await;
        assert_eq!(sem.current_bytes(), 924);
        drop(permit);
        assert_eq!(sem.current_bytes(), 1024);
    }

    #[tokio::test]
    async fn overdraft_is_permitted_once() {
        let sem = semaphore(100);
        let permit = sem.acquire(1_000).await;
        assert_eq!(sem.current_bytes(), -900);
        drop(permit);
        assert_eq!(sem.current_bytes(), 100);
    }

    #[tokio::test]
    async fn with_bytes_releases_on_panic() {
        let sem = Arc::new(semaphore(1024));
        let sem2 = sem.clone();
        let result = tokio::spawn(async move {
            sem2.with_bytes(100, || async { panic!("boom") }).await
        })
        .await;
        assert!(result.is_err());
        assert_eq!(sem.current_bytes(), 1024);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn two_concurrent_overdrawn_calls_serialize() {
        let sem = Arc::new(semaphore(1 * 1024 * 1024));
        let order = Arc::new(Mutex::new(Vec::new()));

        // Push balance negative.
        let first_permit = sem.acquire(2 * 1024 * 1024).await;
        assert!(sem.current_bytes() < 0);

        let sem_a = sem.clone();
        let order_a = order.clone();
        let task_a = tokio::spawn(async move {
            let _p = sem_a.acquire(100_000).await;
            order_a.lock().unwrap().push("a");
            tokio::time::sleep(Duration::from_millis(20)).await;
        });

        tokio::time::sleep(Duration::from_millis(10)).await;

        let sem_b = sem.clone();
        let order_b = order.clone();
        let task_b = tokio::spawn(async move {
            let _p = sem_b.acquire(100_000).await;
            order_b.lock().unwrap().push("b");
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(first_permit);

        task_a.await.unwrap();
        task_b.await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn cancelled_waiter_is_not_charged() {
        let sem = Arc::new(semaphore(100));
        let _overdraft_permit = sem.acquire(1_000).await;
        assert!(sem.current_bytes() < 0);

        {
            let sem2 = sem.clone();
            let fut = sem2.acquire(50);
            tokio::pin!(fut);
            let _ = futures::poll!(fut.as_mut());
            // dropped here without ever being woken
        }

        // No leaked waiter: releasing the overdraft should make the
        // semaphore immediately non-negative since the queue is empty.
        drop(_overdraft_permit);
        assert!(sem.current_bytes() >= 0);
        let counter = Arc::new(AtomicUsize::new(0));
        let _ = counter.load(Ordering::SeqCst);
    }

    #[tokio::test]
    async fn cancellation_after_wake_refunds_the_charge() {
        let sem = Arc::new(semaphore(100));
        let overdraft_permit = sem.acquire(1_000).await;
        assert!(sem.current_bytes() < 0);

        let sem2 = sem.clone();
        let fut = sem2.acquire(50);
        tokio::pin!(fut);
        // Registers the waiter without resolving it.
        assert!(futures::poll!(fut.as_mut()).is_pending());

        // Releasing the overdraft wakes and charges the queued waiter for
        // its 50 bytes, but the task awaiting `fut` is never polled again.
        drop(overdraft_permit);

        // Dropping the still-pending future here simulates the task being
        // cancelled between the wake and its next poll, before it ever
        // builds a `BytesPermit` to own the charge.
        drop(fut);

        assert_eq!(sem.current_bytes(), 100);
    }
}
