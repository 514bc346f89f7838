//! Auxiliary subscription cleanup.

use super::{ConnectionRef, SubscriptionRegistry};
use crate::core::EntityRef;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

/// An auxiliary watch that tears a source's subscriptions down when the
/// watched element stops or is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CleanupHook {
    /// The element that owns the monitor; all of its subscriptions go.
    Source(EntityRef),
    /// A watched destination; subscriptions targeting it go.
    Destination(EntityRef),
}

impl CleanupHook {
    /// Element the hook watches.
    pub fn target(&self) -> EntityRef {
        match self {
            Self::Source(entity) | Self::Destination(entity) => *entity,
        }
    }
}

/// Registers cleanup hooks idempotently and performs immediate removal of an
/// element's subscriptions.
///
/// One coordinator is normally shared by every monitor on a registry so
/// that hooks for the same source are only registered once.
pub struct CleanupCoordinator {
    registry: Arc<dyn SubscriptionRegistry>,
    hooks: DashMap<String, HashSet<CleanupHook>>,
}

impl CleanupCoordinator {
    /// Create a coordinator in front of `registry`.
    pub fn new(registry: Arc<dyn SubscriptionRegistry>) -> Self {
        Self {
            registry,
            hooks: DashMap::new(),
        }
    }

    /// Registry this coordinator forwards to.
    pub fn registry(&self) -> &Arc<dyn SubscriptionRegistry> {
        &self.registry
    }

    /// Watch the monitor's own source element, if it has one.
    ///
    /// Returns `true` when a new hook was registered.
    pub fn try_add_cleanup(
        &self,
        source_id: &str,
        connection: &ConnectionRef,
        source_element: Option<EntityRef>,
    ) -> bool {
        match source_element {
            Some(element) => self.try_add(source_id, connection, CleanupHook::Source(element)),
            None => false,
        }
    }

    /// Watch a destination element so its subscriptions are dropped with it.
    ///
    /// Returns `true` when a new hook was registered.
    pub fn try_add_destination_cleanup(
        &self,
        source_id: &str,
        connection: &ConnectionRef,
        destination: EntityRef,
    ) -> bool {
        self.try_add(source_id, connection, CleanupHook::Destination(destination))
    }

    fn try_add(&self, source_id: &str, connection: &ConnectionRef, hook: CleanupHook) -> bool {
        let inserted = self
            .hooks
            .entry(source_id.to_string())
            .or_default()
            .insert(hook);
        if !inserted {
            return false;
        }

        match self.registry.add_cleanup_hook(source_id, connection, &hook) {
            Ok(()) => {
                tracing::debug!(source_id, ?hook, "cleanup hook registered");
                true
            }
            Err(e) => {
                tracing::warn!(source_id, ?hook, error = %e, "failed to register cleanup hook");
                if let Some(mut set) = self.hooks.get_mut(source_id) {
                    set.remove(&hook);
                }
                self.hooks.remove_if(source_id, |_, set| set.is_empty());
                false
            }
        }
    }

    /// Drop the local record of `source_id`'s hooks without touching the
    /// registry, so the next `try_add_*` call registers them again.
    ///
    /// The registry removes hooks on its own when they fire; a monitor calls
    /// this before reinstalling its hooks on start.
    pub fn forget(&self, source_id: &str) {
        self.hooks.remove(source_id);
    }

    /// Forget and deregister every hook installed for `source_id`.
    pub fn remove_hooks(&self, source_id: &str, connection: &ConnectionRef) {
        if self.hooks.remove(source_id).is_none() {
            return;
        }
        if let Err(e) = self.registry.remove_cleanup_hooks(source_id, connection) {
            tracing::warn!(source_id, error = %e, "failed to remove cleanup hooks");
        }
    }

    /// Remove all subscriptions registered under the element's composite key.
    ///
    /// Called synchronously from the delivery thread when a self-watching
    /// monitor sees its element stop or disappear.
    pub fn on_terminal_state(&self, entity: &EntityRef, connection: &ConnectionRef) {
        let key = entity.key();
        tracing::debug!(key = %key, "element stopped or deleted, removing its subscriptions");
        self.hooks.remove(&key);
        if let Err(e) = self.registry.remove_subscriptions(&key, connection) {
            tracing::warn!(key = %key, error = %e, "failed to remove subscriptions");
        }
    }

    /// Hooks currently installed for `source_id`.
    pub fn hooks(&self, source_id: &str) -> Vec<CleanupHook> {
        self.hooks
            .get(source_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MonitorError, Result};
    use crate::registry::{InMemoryRegistry, LocalConnection, RegistryOp};
    use crate::subscription::SubscriptionHandle;

    struct FailingHooks;

    impl SubscriptionRegistry for FailingHooks {
        fn create_subscription(
            &self,
            _: &str,
            _: &ConnectionRef,
            _: Arc<SubscriptionHandle>,
            _: bool,
        ) -> Result<()> {
            Ok(())
        }

        fn remove_subscription(&self, _: &str, _: &ConnectionRef, _: &SubscriptionHandle, _: bool) -> Result<()> {
            Ok(())
        }

        fn remove_subscriptions(&self, _: &str, _: &ConnectionRef) -> Result<()> {
            Err(MonitorError::registry("connection lost"))
        }

        fn add_cleanup_hook(&self, _: &str, _: &ConnectionRef, _: &CleanupHook) -> Result<()> {
            Err(MonitorError::registry("connection lost"))
        }

        fn remove_cleanup_hooks(&self, _: &str, _: &ConnectionRef) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_hooks_are_idempotent() {
        let registry = Arc::new(InMemoryRegistry::new());
        let coordinator = CleanupCoordinator::new(registry.clone());
        let conn = LocalConnection::shared("c");
        let dest = EntityRef::new(1, 5);

        assert!(coordinator.try_add_destination_cleanup("src", &conn, dest));
        assert!(!coordinator.try_add_destination_cleanup("src", &conn, dest));

        let adds = registry
            .operations()
            .into_iter()
            .filter(|op| matches!(op, RegistryOp::AddHook { .. }))
            .count();
        assert_eq!(adds, 1);
        assert_eq!(coordinator.hooks("src"), vec![CleanupHook::Destination(dest)]);
    }

    #[test]
    fn test_source_cleanup_requires_source_element() {
        let registry = Arc::new(InMemoryRegistry::new());
        let coordinator = CleanupCoordinator::new(registry);
        let conn = LocalConnection::shared("c");

        assert!(!coordinator.try_add_cleanup("script", &conn, None));
        assert!(coordinator.try_add_cleanup("1/2", &conn, Some(EntityRef::new(1, 2))));
        assert_eq!(coordinator.hooks("1/2"), vec![CleanupHook::Source(EntityRef::new(1, 2))]);
    }

    #[test]
    fn test_failed_registration_is_not_fatal() {
        let coordinator = CleanupCoordinator::new(Arc::new(FailingHooks));
        let conn = LocalConnection::shared("c");

        assert!(!coordinator.try_add_destination_cleanup("src", &conn, EntityRef::new(1, 5)));
        assert!(coordinator.hooks("src").is_empty());

        // Failure to remove is only logged.
        coordinator.on_terminal_state(&EntityRef::new(1, 5), &conn);
    }

    #[test]
    fn test_remove_hooks() {
        let registry = Arc::new(InMemoryRegistry::new());
        let coordinator = CleanupCoordinator::new(registry.clone());
        let conn = LocalConnection::shared("c");

        coordinator.try_add_destination_cleanup("src", &conn, EntityRef::new(1, 5));
        coordinator.remove_hooks("src", &conn);
        coordinator.remove_hooks("src", &conn);

        assert!(coordinator.hooks("src").is_empty());
        let removals = registry
            .operations()
            .into_iter()
            .filter(|op| matches!(op, RegistryOp::RemoveHooks { .. }))
            .count();
        assert_eq!(removals, 1);
    }

    #[test]
    fn test_forget_allows_reinstall() {
        let registry = Arc::new(InMemoryRegistry::new());
        let coordinator = CleanupCoordinator::new(registry.clone());
        let conn = LocalConnection::shared("c");
        let dest = EntityRef::new(1, 5);

        assert!(coordinator.try_add_destination_cleanup("src", &conn, dest));
        coordinator.forget("src");
        assert!(coordinator.hooks("src").is_empty());
        assert!(coordinator.try_add_destination_cleanup("src", &conn, dest));

        // The registry keeps a single copy.
        assert_eq!(registry.hooks_for("src"), vec![CleanupHook::Destination(dest)]);
    }

    #[test]
    fn test_hook_target() {
        let e = EntityRef::new(3, 4);
        assert_eq!(CleanupHook::Source(e).target(), e);
        assert_eq!(CleanupHook::Destination(e).target(), e);
    }
}
