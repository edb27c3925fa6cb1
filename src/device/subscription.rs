//! Callback-driven event subscription.
//!
//! A [`Subscription`] owns a spawned task that pulls from an [`EventStream`] and
//! invokes a callback for every notification. The callback therefore runs on a
//! different task (and possibly a different worker thread) than the test that
//! registered it.
//!
//! Cancellation is explicit: [`Subscription::cancel`] aborts the task and waits
//! for it, so once it returns the callback will never be invoked again.
//! Dropping the handle aborts delivery too, which is what happens when an
//! operator interrupt drops an in-flight test.

use super::{DeviceEvent, DeviceSession, EventStream, Status};
use crate::error::AppResult;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Handle to a running event subscription.
#[derive(Debug)]
pub struct Subscription {
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Start delivering events from `stream` to `on_event`.
    pub fn spawn<F>(mut stream: EventStream, mut on_event: F) -> Self
    where
        F: FnMut(Status, &DeviceEvent) + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            while let Some((status, event)) = stream.next().await {
                on_event(status, &event);
            }
            debug!("Device event stream ended");
        });
        Self {
            handle: Some(handle),
        }
    }

    /// True while the delivery task is still running.
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop delivery and wait until the callback can no longer run.
    pub async fn cancel(mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        handle.abort();
        match handle.await {
            Ok(()) => debug!("Subscription finished before cancellation"),
            Err(err) if err.is_cancelled() => debug!("Subscription cancelled"),
            Err(err) => warn!(error = %err, "Event callback panicked"),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Open the session's event stream and deliver it to `on_event`.
pub async fn subscribe<F>(session: &dyn DeviceSession, on_event: F) -> AppResult<Subscription>
where
    F: FnMut(Status, &DeviceEvent) + Send + 'static,
{
    let stream = session.subscribe_events().await?;
    Ok(Subscription::spawn(stream, on_event))
}
