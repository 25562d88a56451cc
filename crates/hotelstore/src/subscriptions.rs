//! # Subscription Handles
//!
//! A live feed is either a remote watch (cancelled by calling the remote's
//! unsubscribe closure) or a local poll task (cancelled by aborting the Tokio
//! task). [`SubscriptionHandle`] hides the difference so callers and the
//! [`SubscriptionRegistry`] treat both uniformly.
//!
//! Handles are cheap to clone; all clones share one cancel-once slot, so the
//! caller can keep a copy while the registry tracks another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

/// Callback invoked with the full, ordered collection on every update.
pub type ListingsCallback = Arc<dyn Fn(Vec<crate::model::Listing>) + Send + Sync>;

type CancelFn = Box<dyn FnOnce() + Send>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
pub struct SubscriptionHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    id: u64,
    cancel: Mutex<Option<CancelFn>>,
}

impl SubscriptionHandle {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            inner: Arc::new(HandleInner {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                cancel: Mutex::new(Some(Box::new(cancel))),
            }),
        }
    }

    /// Wraps a background task; cancelling aborts it.
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self::new(move || task.abort())
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Stops the feed. Calling it again, from any clone, does nothing.
    pub fn cancel(&self) {
        let cancel = self
            .inner
            .cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(cancel) = cancel {
            cancel();
            debug!(subscription = self.inner.id, "subscription cancelled");
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner
            .cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.inner.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Tracks every handle the facade handed out. Dropping the registry cancels
/// whatever is still tracked, so poll timers never outlive their facade.
#[derive(Default)]
pub struct SubscriptionRegistry {
    handles: Mutex<Vec<SubscriptionHandle>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, handle: SubscriptionHandle) {
        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        handles.retain(SubscriptionHandle::is_active);
        handles.push(handle);
    }

    /// Cancels and forgets every tracked handle. Safe to call repeatedly.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<SubscriptionHandle> = {
            let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
            handles.drain(..).collect()
        };
        let count = drained.len();
        for handle in drained {
            handle.cancel();
        }
        count
    }

    pub fn active_count(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|h| h.is_active())
            .count()
    }
}

impl Drop for SubscriptionRegistry {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
