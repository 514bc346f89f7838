//! Delivery-thread handler for one subscription.

use crate::core::{ElementState, StateChange};
use crate::error::Result;
use crate::event::{EventMatcher, RawEvent};
use crate::registry::{CleanupCoordinator, ConnectionRef};
use crate::subscription::{ChangeCache, SubscriptionHandle};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

#[cfg(feature = "metrics")]
use crate::metrics::MonitorMetrics;

/// Consumer callback invoked once per reportable state change.
pub type StateCallback = Arc<dyn Fn(StateChange) + Send + Sync>;

/// Whether a handler removes its element's subscriptions on Stopped/Deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPolicy {
    /// Leave cleanup to registry-side hooks.
    None,
    /// Remove every subscription under the element's key before reporting.
    SelfCleanup,
}

/// What happened to one delivered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Event reached an active handler
    Received,
    /// Foreign tag, unrecognized payload or another element
    Discarded,
    /// Callback invoked for a new state
    Fired,
    /// Same state as last reported
    Duplicate,
    /// Callback panicked
    CallbackFailed,
    /// Matching or decoding failed
    HandlerFailed,
    /// Self-cleanup removal issued
    CleanupTriggered,
    /// Pending queue was full and its oldest event was dropped
    PendingDropped,
}

/// Per-subscription handler, built once per `start`.
///
/// Holds the identifiers the subscription was created for; shared state
/// (cache, queue) is reached through the [`SubscriptionHandle`] it is
/// invoked with.
pub struct StateEventHandler {
    source_id: Arc<str>,
    matcher: EventMatcher,
    policy: CleanupPolicy,
    coordinator: Arc<CleanupCoordinator>,
    on_change: StateCallback,
    #[cfg(feature = "metrics")]
    metrics: Option<MonitorMetrics>,
}

impl StateEventHandler {
    pub(crate) fn new(
        source_id: impl Into<Arc<str>>,
        matcher: EventMatcher,
        policy: CleanupPolicy,
        coordinator: Arc<CleanupCoordinator>,
        on_change: StateCallback,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            matcher,
            policy,
            coordinator,
            on_change,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    #[cfg(feature = "metrics")]
    pub(crate) fn with_metrics(mut self, metrics: Option<MonitorMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Cleanup behaviour selected at start.
    pub fn policy(&self) -> CleanupPolicy {
        self.policy
    }

    pub(crate) fn handle(&self, handle: &SubscriptionHandle, connection: &ConnectionRef, event: &RawEvent) {
        if !handle.is_active() {
            return;
        }
        self.count(DeliveryOutcome::Received);

        match panic::catch_unwind(AssertUnwindSafe(|| self.process(handle, connection, event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.count(DeliveryOutcome::HandlerFailed);
                tracing::error!(
                    set_id = handle.set_id(),
                    event = ?event,
                    error = %e,
                    "failed to handle element state event"
                );
            }
            Err(payload) => {
                self.count(DeliveryOutcome::HandlerFailed);
                tracing::error!(
                    set_id = handle.set_id(),
                    event = ?event,
                    panic = %panic_message(&*payload),
                    "panic while handling element state event"
                );
            }
        }
    }

    fn process(&self, handle: &SubscriptionHandle, connection: &ConnectionRef, event: &RawEvent) -> Result<()> {
        let Some(ev) = self.matcher.matches(event)? else {
            self.count(DeliveryOutcome::Discarded);
            return Ok(());
        };

        tracing::debug!(
            set_id = handle.set_id(),
            entity = %ev.entity,
            state = %ev.state,
            level = ev.level,
            startup_complete = ev.startup_complete,
            "state event matched"
        );

        // Cleanup does not depend on the dedup outcome below.
        if self.policy == CleanupPolicy::SelfCleanup && ev.state.is_terminal() {
            self.count(DeliveryOutcome::CleanupTriggered);
            self.coordinator.on_terminal_state(&ev.entity, connection);
        }

        if !ev.is_reportable() {
            return Ok(());
        }

        let key = ChangeCache::<ElementState>::result_key(&ev.entity);
        if !handle
            .cache()
            .replace_if_different(&self.source_id, handle.set_id(), &key, ev.state)
        {
            self.count(DeliveryOutcome::Duplicate);
            return Ok(());
        }

        if !handle.enqueue(event.clone()) {
            self.count(DeliveryOutcome::PendingDropped);
            tracing::warn!(set_id = handle.set_id(), "pending queue full, oldest event dropped");
        }

        if !handle.is_active() {
            tracing::debug!(set_id = handle.set_id(), "subscription stopped, callback suppressed");
            return Ok(());
        }

        let change = StateChange::new(ev.entity, &*self.source_id, ev.state, Arc::clone(connection));
        self.invoke(handle.set_id(), change);
        Ok(())
    }

    fn invoke(&self, set_id: &str, change: StateChange) {
        tracing::debug!(set_id, entity = %change.entity(), state = %change.state(), "state changed, invoking callback");

        match panic::catch_unwind(AssertUnwindSafe(|| (self.on_change)(change))) {
            Ok(()) => self.count(DeliveryOutcome::Fired),
            Err(payload) => {
                self.count(DeliveryOutcome::CallbackFailed);
                tracing::error!(
                    set_id,
                    panic = %panic_message(&*payload),
                    "state change callback panicked"
                );
            }
        }
    }

    #[cfg(feature = "metrics")]
    fn count(&self, outcome: DeliveryOutcome) {
        if let Some(metrics) = &self.metrics {
            metrics.record(outcome);
        }
    }

    #[cfg(not(feature = "metrics"))]
    fn count(&self, _outcome: DeliveryOutcome) {}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
