//! Element identity and lifecycle state.

use crate::registry::ConnectionRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a managed element by owner and element id.
///
/// An `entity_id` of [`EntityRef::ALL`] selects every element under the owner.
///
/// # Examples
///
/// ```rust
/// use element_monitor::EntityRef;
///
/// let element = EntityRef::new(12, 34);
/// assert_eq!(element.key(), "12/34");
/// assert!(EntityRef::owner_wide(12).is_owner_wide());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Owning agent id
    pub owner_id: i32,
    /// Element id under the owner, or -1 for all elements
    pub entity_id: i32,
}

impl EntityRef {
    /// Wildcard element id.
    pub const ALL: i32 = -1;

    /// Create a reference to a single element.
    pub const fn new(owner_id: i32, entity_id: i32) -> Self {
        Self {
            owner_id,
            entity_id,
        }
    }

    /// Create a reference to every element under `owner_id`.
    pub const fn owner_wide(owner_id: i32) -> Self {
        Self::new(owner_id, Self::ALL)
    }

    /// Whether this reference selects all elements under its owner.
    pub fn is_owner_wide(&self) -> bool {
        self.entity_id == Self::ALL
    }

    /// Composite key `"{owner_id}/{entity_id}"`, used as a registry key.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner_id, self.entity_id)
    }
}

/// Platform-neutral element lifecycle state.
///
/// Transport codes without a known counterpart are kept as
/// [`ElementState::Unmapped`] rather than folded into a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementState {
    /// State not (yet) known
    Undefined,
    /// Element is running
    Active,
    /// Element is hidden
    Hidden,
    /// Element is paused
    Paused,
    /// Element is stopped
    Stopped,
    /// Element was deleted
    Deleted,
    /// Element is in error
    Error,
    /// Element is restarting
    Restart,
    /// Element is masked
    Masked,
    /// Transport code with no mapping
    Unmapped(i32),
}

impl ElementState {
    /// Map a transport-level state code.
    pub fn from_transport(code: i32) -> Self {
        match code {
            0 => Self::Undefined,
            1 => Self::Active,
            2 => Self::Hidden,
            3 => Self::Paused,
            4 => Self::Stopped,
            6 => Self::Deleted,
            10 => Self::Error,
            11 => Self::Restart,
            12 => Self::Masked,
            other => Self::Unmapped(other),
        }
    }

    /// Transport code for this state.
    pub fn transport_code(&self) -> i32 {
        match self {
            Self::Undefined => 0,
            Self::Active => 1,
            Self::Hidden => 2,
            Self::Paused => 3,
            Self::Stopped => 4,
            Self::Deleted => 6,
            Self::Error => 10,
            Self::Restart => 11,
            Self::Masked => 12,
            Self::Unmapped(code) => *code,
        }
    }

    /// Stopped and Deleted end every subscription tied to the element.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Deleted)
    }
}

impl fmt::Display for ElementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unmapped(code) => write!(f, "Unmapped({})", code),
            other => write!(f, "{:?}", other),
        }
    }
}

/// A reportable state change delivered to the consumer callback.
#[derive(Debug, Clone)]
pub struct StateChange {
    entity: EntityRef,
    source_id: String,
    state: ElementState,
    connection: ConnectionRef,
}

impl StateChange {
    pub(crate) fn new(
        entity: EntityRef,
        source_id: impl Into<String>,
        state: ElementState,
        connection: ConnectionRef,
    ) -> Self {
        Self {
            entity,
            source_id: source_id.into(),
            state,
            connection,
        }
    }

    /// The element whose state changed.
    pub fn entity(&self) -> EntityRef {
        self.entity
    }

    /// Identifier of the monitor's source.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// The newly observed state.
    pub fn state(&self) -> ElementState {
        self.state
    }

    /// Connection the event arrived on, for replies.
    pub fn connection(&self) -> &ConnectionRef {
        &self.connection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_and_display() {
        let entity = EntityRef::new(12, 34);
        assert_eq!(entity.key(), "12/34");
        assert_eq!(EntityRef::owner_wide(7).to_string(), "7/-1");
    }

    #[test]
    fn test_owner_wide() {
        assert!(EntityRef::owner_wide(1).is_owner_wide());
        assert!(!EntityRef::new(1, 2).is_owner_wide());
    }

    #[test]
    fn test_transport_mapping() {
        assert_eq!(ElementState::from_transport(1), ElementState::Active);
        assert_eq!(ElementState::from_transport(4), ElementState::Stopped);
        assert_eq!(ElementState::from_transport(6), ElementState::Deleted);
        assert_eq!(ElementState::from_transport(5), ElementState::Unmapped(5));
        assert_eq!(ElementState::from_transport(99), ElementState::Unmapped(99));
    }

    #[test]
    fn test_transport_code_inverts_mapping() {
        for code in [0, 1, 2, 3, 4, 6, 10, 11, 12, 42] {
            assert_eq!(ElementState::from_transport(code).transport_code(), code);
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(ElementState::Stopped.is_terminal());
        assert!(ElementState::Deleted.is_terminal());
        assert!(!ElementState::Active.is_terminal());
        assert!(!ElementState::Unmapped(4).is_terminal());
    }
}
