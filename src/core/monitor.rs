//! The element state monitor.

use crate::core::{
    CleanupPolicy, EntityRef, MonitorBuilder, StateChange, StateEventHandler,
};
use crate::error::Result;
use crate::event::EventMatcher;
use crate::registry::{CleanupCoordinator, ConnectionRef, SubscriptionRegistry};
use crate::settings::MonitorSettings;
use crate::subscription::{FilterCriterion, SubscriptionHandle};
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::sync::Arc;

#[cfg(feature = "metrics")]
use crate::metrics::MonitorMetrics;

/// Lifecycle of a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Built, never started
    Created,
    /// A subscription is registered
    Started,
    /// Stopped; may be started again
    Stopped,
}

/// How the selection relates to the monitor's source.
enum WatchKind {
    /// Every element under an owner
    OwnerWide,
    /// The monitor's own source element
    OwnElement,
    /// Some other element
    Destination,
}

/// Watches the lifecycle state of an element (or every element under an
/// owner) and reports each real change once.
///
/// # Examples
///
/// ```rust
/// use element_monitor::prelude::*;
/// use std::sync::Arc;
///
/// # fn example() -> Result<()> {
/// let registry = Arc::new(InMemoryRegistry::new());
/// let conn = LocalConnection::shared("session-1");
///
/// let monitor = ElementStateMonitor::builder(registry.clone(), conn.clone())
///     .source_element(EntityRef::new(12, 1))
///     .selection(EntityRef::new(12, 34))
///     .build()?;
///
/// monitor.start(|change| {
///     println!("{} -> {}", change.entity(), change.state());
/// })?;
/// assert_eq!(monitor.state(), MonitorState::Started);
///
/// monitor.stop(false);
/// assert_eq!(monitor.state(), MonitorState::Stopped);
/// # Ok(())
/// # }
/// ```
pub struct ElementStateMonitor {
    registry: Arc<dyn SubscriptionRegistry>,
    coordinator: Arc<CleanupCoordinator>,
    connection: ConnectionRef,
    source_id: Arc<str>,
    source_element: Option<EntityRef>,
    selection: EntityRef,
    set_id: String,
    settings: MonitorSettings,
    current: ArcSwapOption<SubscriptionHandle>,
    lifecycle: Mutex<MonitorState>,
    #[cfg(feature = "metrics")]
    metrics: Option<MonitorMetrics>,
}

impl ElementStateMonitor {
    /// Start building a monitor that registers with `registry` on `connection`.
    pub fn builder(registry: Arc<dyn SubscriptionRegistry>, connection: ConnectionRef) -> MonitorBuilder {
        MonitorBuilder::new(registry, connection)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        registry: Arc<dyn SubscriptionRegistry>,
        coordinator: Arc<CleanupCoordinator>,
        connection: ConnectionRef,
        source_id: String,
        source_element: Option<EntityRef>,
        selection: EntityRef,
        settings: MonitorSettings,
        #[cfg(feature = "metrics")] metrics: Option<MonitorMetrics>,
    ) -> Self {
        let set_id = format!("{}-{}{}", source_id, selection, settings.handle_suffix);
        Self {
            registry,
            coordinator,
            connection,
            source_id: source_id.into(),
            source_element,
            selection,
            set_id,
            settings,
            current: ArcSwapOption::empty(),
            lifecycle: Mutex::new(MonitorState::Created),
            #[cfg(feature = "metrics")]
            metrics,
        }
    }

    /// The watched element, or owner for an owner-wide watch.
    pub fn selection(&self) -> EntityRef {
        self.selection
    }

    /// Element the monitor runs on behalf of, if any.
    pub fn source_element(&self) -> Option<EntityRef> {
        self.source_element
    }

    /// Identifier of the monitor's source.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Tag carried by events for this monitor.
    pub fn set_id(&self) -> &str {
        &self.set_id
    }

    /// Settings in effect.
    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Current lifecycle state.
    pub fn state(&self) -> MonitorState {
        *self.lifecycle.lock()
    }

    /// The registered handle while started.
    pub fn handle(&self) -> Option<Arc<SubscriptionHandle>> {
        self.current.load_full()
    }

    fn watch_kind(&self) -> WatchKind {
        if self.selection.is_owner_wide() {
            WatchKind::OwnerWide
        } else if self.source_element == Some(self.selection) {
            WatchKind::OwnElement
        } else {
            WatchKind::Destination
        }
    }

    /// Register a subscription and report changes to `on_change`.
    ///
    /// Calling `start` again replaces the callback: the previous handle is
    /// retired and deregistered before the new one is registered. Cleanup
    /// hooks are installed only once the subscription is registered.
    ///
    /// # Errors
    ///
    /// Returns the registry's error if the subscription could not be
    /// created. Cleanup hook failures are only logged.
    pub fn start<F>(&self, on_change: F) -> Result<()>
    where
        F: Fn(StateChange) + Send + Sync + 'static,
    {
        let mut lifecycle = self.lifecycle.lock();
        let target = self.selection;
        let kind = self.watch_kind();

        let (policy, filter) = match kind {
            WatchKind::OwnerWide => (
                CleanupPolicy::None,
                FilterCriterion::MatchAll {
                    skip_initial_events: self.settings.skip_initial_events,
                },
            ),
            WatchKind::OwnElement => (CleanupPolicy::SelfCleanup, FilterCriterion::MatchExact(target)),
            WatchKind::Destination => (CleanupPolicy::None, FilterCriterion::MatchExact(target)),
        };

        let handler = StateEventHandler::new(
            Arc::clone(&self.source_id),
            EventMatcher::new(self.set_id.as_str(), target),
            policy,
            Arc::clone(&self.coordinator),
            Arc::new(on_change),
        );
        #[cfg(feature = "metrics")]
        let handler = handler.with_metrics(self.metrics.clone());

        let handle = Arc::new(SubscriptionHandle::new(
            self.set_id.as_str(),
            target.key(),
            vec![filter],
            self.settings.pending_capacity,
            handler,
        ));

        let replaced = match self.current.swap(None) {
            Some(previous) => {
                self.release(&previous, false);
                true
            }
            None => false,
        };

        if let Err(e) = self.registry.create_subscription(
            &self.source_id,
            &self.connection,
            Arc::clone(&handle),
            self.settings.exclusive,
        ) {
            handle.retire();
            if replaced {
                // Nothing is left for these hooks to clean up after.
                self.coordinator.remove_hooks(&self.source_id, &self.connection);
            }
            if *lifecycle == MonitorState::Started {
                *lifecycle = MonitorState::Stopped;
            }
            tracing::error!(set_id = %self.set_id, error = %e, "failed to register state subscription");
            return Err(e);
        }

        // Hooks may have fired since the last start; reinstall from scratch.
        self.coordinator.forget(&self.source_id);
        match kind {
            WatchKind::OwnerWide => {
                self.coordinator
                    .try_add_cleanup(&self.source_id, &self.connection, self.source_element);
            }
            WatchKind::OwnElement => {}
            WatchKind::Destination => {
                self.coordinator
                    .try_add_destination_cleanup(&self.source_id, &self.connection, target);
                self.coordinator
                    .try_add_cleanup(&self.source_id, &self.connection, self.source_element);
            }
        }

        self.current.store(Some(handle));
        *lifecycle = MonitorState::Started;
        tracing::debug!(
            set_id = %self.set_id,
            source_id = %self.source_id,
            selection = %target,
            ?policy,
            "element state monitor started"
        );
        Ok(())
    }

    /// Deregister the subscription and remove the source's cleanup hooks.
    ///
    /// With `force`, the registry does not wait for the remote side to
    /// acknowledge. Calling `stop` on a monitor that is not started does
    /// nothing.
    pub fn stop(&self, force: bool) {
        let mut lifecycle = self.lifecycle.lock();
        let Some(handle) = self.current.swap(None) else {
            return;
        };

        self.release(&handle, force);
        self.coordinator.remove_hooks(&self.source_id, &self.connection);
        *lifecycle = MonitorState::Stopped;
        tracing::debug!(set_id = %self.set_id, force, "element state monitor stopped");
    }

    fn release(&self, handle: &SubscriptionHandle, force: bool) {
        handle.retire();
        if let Err(e) = self
            .registry
            .remove_subscription(&self.source_id, &self.connection, handle, force)
        {
            tracing::warn!(set_id = %self.set_id, error = %e, "failed to remove state subscription");
        }
    }
}

impl Drop for ElementStateMonitor {
    fn drop(&mut self) {
        self.stop(true);
    }
}

impl std::fmt::Debug for ElementStateMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementStateMonitor")
            .field("source_id", &self.source_id)
            .field("selection", &self.selection)
            .field("set_id", &self.set_id)
            .field("state", &self.state())
            .finish()
    }
}
