//! Collaborators the monitor talks to: connections and the subscription registry.
//!
//! The registry is the component that owns active subscriptions per
//! connection and pushes tagged events into [`SubscriptionHandle::deliver`].
//! [`InMemoryRegistry`] is a complete in-process implementation.

mod cleanup;
mod memory;

pub use cleanup::{CleanupCoordinator, CleanupHook};
pub use memory::{InMemoryRegistry, RegistryOp};

use crate::error::Result;
use crate::subscription::SubscriptionHandle;
use std::fmt;
use std::sync::Arc;

/// A session events arrive on and replies can be sent over.
pub trait Connection: fmt::Debug + Send + Sync {
    /// Stable identifier of the session.
    fn id(&self) -> &str;
}

/// Shared reference to a connection.
pub type ConnectionRef = Arc<dyn Connection>;

/// Plain named connection for in-process use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConnection {
    id: String,
}

impl LocalConnection {
    /// Create a connection with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Create a connection already wrapped as a [`ConnectionRef`].
    pub fn shared(id: impl Into<String>) -> ConnectionRef {
        Arc::new(Self::new(id))
    }
}

impl Connection for LocalConnection {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Tracks which subscriptions are active per connection.
///
/// Calls are expected to complete quickly; the monitor logs failures and
/// never retries them.
pub trait SubscriptionRegistry: Send + Sync {
    /// Register `handle` for `source_id`. With `exclusive`, an existing
    /// registration under the same `(source_id, set_id)` is replaced.
    fn create_subscription(
        &self,
        source_id: &str,
        connection: &ConnectionRef,
        handle: Arc<SubscriptionHandle>,
        exclusive: bool,
    ) -> Result<()>;

    /// Deregister `handle`. With `force`, do not wait for the remote side to
    /// acknowledge the unsubscribe.
    fn remove_subscription(
        &self,
        source_id: &str,
        connection: &ConnectionRef,
        handle: &SubscriptionHandle,
        force: bool,
    ) -> Result<()>;

    /// Remove every subscription registered under `composite_key`.
    fn remove_subscriptions(&self, composite_key: &str, connection: &ConnectionRef) -> Result<()>;

    /// Install an auxiliary cleanup hook for `source_id`. Installing a hook
    /// that is already present must leave a single copy.
    fn add_cleanup_hook(
        &self,
        source_id: &str,
        connection: &ConnectionRef,
        hook: &CleanupHook,
    ) -> Result<()>;

    /// Remove all cleanup hooks installed for `source_id`.
    fn remove_cleanup_hooks(&self, source_id: &str, connection: &ConnectionRef) -> Result<()>;
}
