//! Single-slot notification channel.
//!
//! Bridges an asynchronous event stream into sequential test logic: one waiter
//! suspends in [`Notification::wait`] until a producer running in another
//! context signals it, or until the timeout elapses.
//!
//! The signal is a latch, not a counter. Once signalled, every pending or future
//! `wait` returns `true` immediately until the next [`Notification::clear`].
//!
//! A notification can additionally be *armed* with the state the waiter is
//! tracking. Producers advance that state through [`Notification::update_if`],
//! which only latches when something is armed and the update reports progress.
//! Arming and clearing happen in one step, so a producer never observes a new
//! expectation next to a stale signal. A waiter that needs several updates in
//! a row waits on the armed state itself with [`Notification::wait_until`], so
//! updates that land back to back are never collapsed into one signal.
//!
//! Built on `tokio::sync::watch`: the slot is the watched value and waiters
//! subscribe to it.

use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone)]
struct Slot<T> {
    armed: Option<T>,
    signaled: bool,
}

/// Latching notification with an optional armed expectation of type `T`.
#[derive(Debug)]
pub struct Notification<T = ()> {
    slot: watch::Sender<Slot<T>>,
}

impl<T> Notification<T>
where
    T: Send + Sync + 'static,
{
    /// Create an unsignalled, unarmed notification.
    pub fn new() -> Self {
        let (slot, _) = watch::channel(Slot {
            armed: None,
            signaled: false,
        });
        Self { slot }
    }

    /// Latch the signal, waking any waiter.
    pub fn signal(&self) {
        self.slot.send_if_modified(|slot| {
            let changed = !slot.signaled;
            slot.signaled = true;
            changed
        });
    }

    /// Reset to the unsignalled state. The armed expectation is kept.
    pub fn clear(&self) {
        self.slot.send_modify(|slot| slot.signaled = false);
    }

    /// Clear the signal and arm `expectation` in one step.
    pub fn arm(&self, expectation: T) {
        self.slot.send_modify(|slot| {
            slot.armed = Some(expectation);
            slot.signaled = false;
        });
    }

    /// Drop the armed expectation and clear the signal.
    pub fn disarm(&self) {
        self.slot.send_modify(|slot| {
            slot.armed = None;
            slot.signaled = false;
        });
    }

    /// Let `update` advance the armed state; latch the signal if it did.
    ///
    /// Returns whether this call signalled. Offers made while nothing is armed
    /// are discarded.
    pub fn update_if<F>(&self, update: F) -> bool
    where
        F: FnOnce(&mut T) -> bool,
    {
        let mut advanced = false;
        self.slot.send_if_modified(|slot| {
            advanced = slot.armed.as_mut().is_some_and(update);
            if advanced {
                slot.signaled = true;
            }
            advanced
        });
        advanced
    }

    /// True if the signal is latched.
    pub fn is_signaled(&self) -> bool {
        self.slot.borrow().signaled
    }

    /// True if an expectation is armed.
    pub fn is_armed(&self) -> bool {
        self.slot.borrow().armed.is_some()
    }

    /// Wait until signalled or until `timeout` elapses.
    ///
    /// Returns `true` if signalled, `false` on timeout.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let mut rx = self.slot.subscribe();
        // The sender lives in `self`, so `wait_for` only ends on a signal.
        let signaled = rx.wait_for(|slot| slot.signaled);
        let signaled = matches!(tokio::time::timeout(timeout, signaled).await, Ok(Ok(_)));
        signaled
    }

    /// Wait until the armed state satisfies `ready` or until `timeout` elapses.
    ///
    /// Returns immediately if it already does. Never completes while unarmed.
    pub async fn wait_until<F>(&self, timeout: Duration, mut ready: F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        let mut rx = self.slot.subscribe();
        let reached = rx.wait_for(|slot| slot.armed.as_ref().is_some_and(&mut ready));
        let reached = matches!(tokio::time::timeout(timeout, reached).await, Ok(Ok(_)));
        reached
    }
}

impl<T> Default for Notification<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_no_earlier_than_timeout() {
        let notification: Notification = Notification::new();
        notification.clear();

        let start = Instant::now();
        assert!(!notification.wait(Duration::from_secs(10)).await);
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_is_latched_until_cleared() {
        let notification: Notification = Notification::new();
        notification.signal();
        notification.signal();

        let start = Instant::now();
        assert!(notification.wait(Duration::from_secs(10)).await);
        assert!(notification.wait(Duration::from_secs(10)).await);
        assert_eq!(start.elapsed(), Duration::ZERO);

        notification.clear();
        assert!(!notification.is_signaled());
        assert!(!notification.wait(Duration::from_millis(5)).await);
    }

    #[tokio::test]
    async fn test_signal_from_other_task_wakes_waiter() {
        let notification: Arc<Notification> = Arc::new(Notification::new());
        let producer = Arc::clone(&notification);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.signal();
        });

        assert!(notification.wait(Duration::from_secs(5)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_if_ignores_offers_while_disarmed() {
        let notification: Notification<u8> = Notification::new();

        assert!(!notification.update_if(|_| true));
        assert!(!notification.is_signaled());

        notification.arm(7);
        assert!(!notification.wait(Duration::from_millis(10)).await);
        assert!(!notification.update_if(|armed| *armed == 3));
        assert!(notification.update_if(|armed| *armed == 7));
        assert!(notification.wait(Duration::from_millis(10)).await);

        notification.disarm();
        assert!(!notification.is_armed());
        assert!(!notification.is_signaled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_updates_are_all_observed() {
        let notification: Notification<u8> = Notification::new();
        notification.arm(0);

        // Two updates land before the waiter looks at the slot.
        assert!(notification.update_if(|count| {
            *count += 1;
            true
        }));
        assert!(notification.update_if(|count| {
            *count += 1;
            true
        }));

        let start = Instant::now();
        assert!(notification.wait_until(Duration::from_secs(1), |count| *count >= 1).await);
        assert!(notification.wait_until(Duration::from_secs(1), |count| *count >= 2).await);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(!notification.wait_until(Duration::from_secs(1), |count| *count >= 3).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_never_completes_unarmed() {
        let notification: Notification<u8> = Notification::new();
        let start = Instant::now();
        assert!(!notification.wait_until(Duration::from_secs(2), |_| true).await);
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_discards_stale_signal() {
        let notification: Notification<&'static str> = Notification::new();
        notification.signal();

        notification.arm("press");
        assert!(!notification.is_signaled());
        assert!(!notification.wait(Duration::from_secs(1)).await);
    }
}
