//! In-process subscription registry.

use super::{CleanupHook, ConnectionRef, SubscriptionRegistry};
use crate::core::{ElementState, EntityRef};
use crate::error::{MonitorError, Result};
use crate::event::{ElementStateEvent, Payload, RawEvent};
use crate::subscription::SubscriptionHandle;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::sync::Arc;

/// A call made against an [`InMemoryRegistry`], in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryOp {
    /// `create_subscription`
    Create {
        /// Source identifier
        source_id: String,
        /// Set identifier of the handle
        set_id: String,
        /// Whether the registration replaces an existing one
        exclusive: bool,
    },
    /// `remove_subscription`
    Remove {
        /// Source identifier
        source_id: String,
        /// Set identifier of the handle
        set_id: String,
        /// Whether graceful unsubscribe was bypassed
        force: bool,
    },
    /// `remove_subscriptions`
    RemoveAll {
        /// Composite key whose subscriptions were removed
        key: String,
    },
    /// `add_cleanup_hook`
    AddHook {
        /// Source identifier
        source_id: String,
        /// Installed hook
        hook: CleanupHook,
    },
    /// `remove_cleanup_hooks`
    RemoveHooks {
        /// Source identifier
        source_id: String,
    },
}

struct Registration {
    connection: ConnectionRef,
    handle: Arc<SubscriptionHandle>,
}

/// Subscription registry held entirely in memory.
///
/// Registrations are keyed by `(source_id, set_id)`. Events pushed through
/// [`deliver`](Self::deliver) are routed to every handle on the same
/// connection whose filters accept the element, then cleanup hooks watching
/// that element are enacted: source hooks on Stopped or Deleted, destination
/// hooks on Deleted only.
///
/// Only events pushed after a subscription is created reach it; there is no
/// replay of current states, so `skip_initial_events` has nothing to skip.
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
///     .source_id("script-1")
///     .selection(EntityRef::new(12, 34))
///     .build()?;
/// monitor.start(|change| println!("{} is now {}", change.entity(), change.state()))?;
///
/// registry.deliver(
///     &conn,
///     &ElementStateEvent::new(EntityRef::new(12, 34), ElementState::Stopped, true),
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct InMemoryRegistry {
    subscriptions: DashMap<(String, String), Registration>,
    hooks: DashMap<String, Vec<CleanupHook>>,
    journal: Mutex<Vec<RegistryOp>>,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active registrations.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether `(source_id, set_id)` is registered.
    pub fn is_registered(&self, source_id: &str, set_id: &str) -> bool {
        self.subscriptions
            .contains_key(&(source_id.to_string(), set_id.to_string()))
    }

    /// Handles registered for `source_id`.
    pub fn subscriptions_for(&self, source_id: &str) -> Vec<Arc<SubscriptionHandle>> {
        self.subscriptions
            .iter()
            .filter(|entry| entry.key().0 == source_id)
            .map(|entry| Arc::clone(&entry.value().handle))
            .collect()
    }

    /// Cleanup hooks installed for `source_id`.
    pub fn hooks_for(&self, source_id: &str) -> Vec<CleanupHook> {
        self.hooks
            .get(source_id)
            .map(|hooks| hooks.clone())
            .unwrap_or_default()
    }

    /// Every call made so far.
    pub fn operations(&self) -> Vec<RegistryOp> {
        self.journal.lock().clone()
    }

    fn record(&self, op: RegistryOp) {
        self.journal.lock().push(op);
    }

    /// Route a state event to matching subscriptions on `connection`.
    ///
    /// Returns the number of handles the event was delivered to.
    pub fn deliver(&self, connection: &ConnectionRef, event: &ElementStateEvent) -> usize {
        let entity = event.entity();

        // Collect first: handlers may call back into the registry.
        let targets: Vec<Arc<SubscriptionHandle>> = self
            .subscriptions
            .iter()
            .filter(|entry| {
                entry.value().connection.id() == connection.id() && entry.value().handle.accepts(&entity)
            })
            .map(|entry| Arc::clone(&entry.value().handle))
            .collect();

        for handle in &targets {
            let raw = RawEvent::new(handle.set_id(), Payload::ElementState(event.clone()));
            handle.deliver(connection, &raw);
        }

        let state = ElementState::from_transport(event.state);
        if state.is_terminal() {
            self.enact_hooks(&entity, state);
        }

        targets.len()
    }

    /// Hand an already tagged event to every handle on `connection`,
    /// leaving tag checks to the handlers.
    pub fn deliver_raw(&self, connection: &ConnectionRef, event: &RawEvent) -> usize {
        let targets: Vec<Arc<SubscriptionHandle>> = self
            .subscriptions
            .iter()
            .filter(|entry| entry.value().connection.id() == connection.id())
            .map(|entry| Arc::clone(&entry.value().handle))
            .collect();

        for handle in &targets {
            handle.deliver(connection, event);
        }
        targets.len()
    }

    fn enact_hooks(&self, entity: &EntityRef, state: ElementState) {
        let fired: Vec<(String, CleanupHook)> = self
            .hooks
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|hook| hook.target() == *entity)
                    // A stopped destination may come back.
                    .filter(|hook| matches!(hook, CleanupHook::Source(_)) || state == ElementState::Deleted)
                    .map(|hook| (entry.key().clone(), *hook))
                    .collect::<Vec<_>>()
            })
            .collect();

        for (source_id, hook) in fired {
            match hook {
                CleanupHook::Source(_) => self.drop_source(&source_id),
                CleanupHook::Destination(target) => {
                    let destination = target.key();
                    self.subscriptions.retain(|(src, _), reg| {
                        !(*src == source_id && reg.handle.destination() == destination)
                    });
                    if let Some(mut hooks) = self.hooks.get_mut(&source_id) {
                        hooks.retain(|h| *h != hook);
                    }
                }
            }
            tracing::debug!(source_id = %source_id, ?hook, "cleanup hook fired");
        }
    }

    fn drop_source(&self, source_id: &str) {
        self.subscriptions.retain(|(src, _), _| src != source_id);
        self.hooks.remove(source_id);
    }
}

impl SubscriptionRegistry for InMemoryRegistry {
    fn create_subscription(
        &self,
        source_id: &str,
        connection: &ConnectionRef,
        handle: Arc<SubscriptionHandle>,
        exclusive: bool,
    ) -> Result<()> {
        self.record(RegistryOp::Create {
            source_id: source_id.to_string(),
            set_id: handle.set_id().to_string(),
            exclusive,
        });

        let key = (source_id.to_string(), handle.set_id().to_string());
        let registration = Registration {
            connection: Arc::clone(connection),
            handle,
        };

        match self.subscriptions.entry(key) {
            Entry::Occupied(mut occ) if exclusive => {
                occ.insert(registration);
                Ok(())
            }
            Entry::Occupied(occ) => Err(MonitorError::DuplicateSubscription {
                source_id: occ.key().0.clone(),
                set_id: occ.key().1.clone(),
            }),
            Entry::Vacant(vac) => {
                vac.insert(registration);
                Ok(())
            }
        }
    }

    fn remove_subscription(
        &self,
        source_id: &str,
        _connection: &ConnectionRef,
        handle: &SubscriptionHandle,
        force: bool,
    ) -> Result<()> {
        self.record(RegistryOp::Remove {
            source_id: source_id.to_string(),
            set_id: handle.set_id().to_string(),
            force,
        });

        // Only drop the registration if it still points at this handle.
        self.subscriptions.remove_if(
            &(source_id.to_string(), handle.set_id().to_string()),
            |_, reg| std::ptr::eq(Arc::as_ptr(&reg.handle), handle),
        );
        Ok(())
    }

    fn remove_subscriptions(&self, composite_key: &str, _connection: &ConnectionRef) -> Result<()> {
        self.record(RegistryOp::RemoveAll {
            key: composite_key.to_string(),
        });
        self.drop_source(composite_key);
        Ok(())
    }

    fn add_cleanup_hook(
        &self,
        source_id: &str,
        _connection: &ConnectionRef,
        hook: &CleanupHook,
    ) -> Result<()> {
        self.record(RegistryOp::AddHook {
            source_id: source_id.to_string(),
            hook: *hook,
        });

        let mut hooks = self.hooks.entry(source_id.to_string()).or_default();
        if !hooks.contains(hook) {
            hooks.push(*hook);
        }
        Ok(())
    }

    fn remove_cleanup_hooks(&self, source_id: &str, _connection: &ConnectionRef) -> Result<()> {
        self.record(RegistryOp::RemoveHooks {
            source_id: source_id.to_string(),
        });
        self.hooks.remove(source_id);
        Ok(())
    }
}
