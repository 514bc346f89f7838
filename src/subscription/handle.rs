//! The per-subscription record shared between a monitor and the registry.

use super::cache::ChangeCache;
use super::filter::FilterCriterion;
use crate::core::{EntityRef, StateEventHandler};
use crate::event::RawEvent;
use crate::registry::ConnectionRef;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Describes one subscription: what it watches and where its state lives.
///
/// A handle is built once per [`start`](crate::ElementStateMonitor::start)
/// and handed to the registry as `Arc<SubscriptionHandle>`. Concurrent
/// delivery threads only ever compare-and-set the change cache and enqueue
/// into the pending queue.
pub struct SubscriptionHandle {
    set_id: String,
    destination: String,
    filters: Vec<FilterCriterion>,
    pending_tx: Sender<RawEvent>,
    pending_rx: Receiver<RawEvent>,
    cache: ChangeCache,
    flag: Notify,
    active: AtomicBool,
    handler: StateEventHandler,
}

impl SubscriptionHandle {
    pub(crate) fn new(
        set_id: impl Into<String>,
        destination: impl Into<String>,
        filters: Vec<FilterCriterion>,
        pending_capacity: usize,
        handler: StateEventHandler,
    ) -> Self {
        let (pending_tx, pending_rx) = bounded(pending_capacity.max(1));
        Self {
            set_id: set_id.into(),
            destination: destination.into(),
            filters,
            pending_tx,
            pending_rx,
            cache: ChangeCache::new(),
            flag: Notify::new(),
            active: AtomicBool::new(true),
            handler,
        }
    }

    /// Tag that inbound events for this subscription carry.
    pub fn set_id(&self) -> &str {
        &self.set_id
    }

    /// Composite key of the watched selection.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Routing filters, in registration order.
    pub fn filters(&self) -> &[FilterCriterion] {
        &self.filters
    }

    /// Last-delivered state store.
    pub fn cache(&self) -> &ChangeCache {
        &self.cache
    }

    /// Whether any filter accepts events about `entity`.
    pub fn accepts(&self, entity: &EntityRef) -> bool {
        self.filters.iter().any(|f| f.accepts(entity))
    }

    /// `false` once the owning monitor stopped or replaced this handle.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Mark the handle inert. Returns `true` on the first call only.
    pub(crate) fn retire(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }

    /// Entry point for the registry's delivery threads.
    ///
    /// Never panics or returns an error: failures are logged and the event
    /// is dropped.
    pub fn deliver(&self, connection: &ConnectionRef, event: &RawEvent) {
        self.handler.handle(self, connection, event);
    }

    /// Queue a delivered event for code awaiting this subscription.
    ///
    /// A full queue gives up its oldest entries so the newest change is
    /// always kept. Returns `false` when something had to be evicted.
    pub(crate) fn enqueue(&self, event: RawEvent) -> bool {
        let mut event = event;
        let mut evicted = false;
        loop {
            match self.pending_tx.try_send(event) {
                Ok(()) => {
                    self.flag.notify_one();
                    return !evicted;
                }
                Err(TrySendError::Full(rejected)) => {
                    self.pending_rx.try_recv().ok();
                    evicted = true;
                    event = rejected;
                }
                // Both ends live in this handle.
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
    }

    /// Take the oldest queued event, if any.
    pub fn try_next(&self) -> Option<RawEvent> {
        self.pending_rx.try_recv().ok()
    }

    /// Number of queued events.
    pub fn pending_len(&self) -> usize {
        self.pending_rx.len()
    }

    /// Wait up to `timeout` for the next reported change.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn wait_for_change(&self, timeout: Duration) -> Option<RawEvent> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(event) = self.try_next() {
                return Some(event);
            }
            if tokio::time::timeout_at(deadline, self.flag.notified())
                .await
                .is_err()
            {
                return self.try_next();
            }
        }
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("set_id", &self.set_id)
            .field("destination", &self.destination)
            .field("filters", &self.filters)
            .field("active", &self.is_active())
            .field("pending", &self.pending_len())
            .finish()
    }
}
