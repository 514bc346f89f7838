//! Raw transport events and their typed decode.

use crate::core::{ElementState, EntityRef};
use crate::error::{MonitorError, Result};

/// Element state payload as it arrives from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementStateEvent {
    /// Owning agent id
    pub owner_id: i32,
    /// Element id
    pub entity_id: i32,
    /// Transport-level state code
    pub state: i32,
    /// Severity level reported alongside the state
    pub level: i32,
    /// Whether the element finished its startup sequence
    pub startup_complete: bool,
}

impl ElementStateEvent {
    /// Build a payload for `entity` in `state`.
    pub fn new(entity: EntityRef, state: ElementState, startup_complete: bool) -> Self {
        Self {
            owner_id: entity.owner_id,
            entity_id: entity.entity_id,
            state: state.transport_code(),
            level: 0,
            startup_complete,
        }
    }

    /// Element the payload describes.
    pub fn entity(&self) -> EntityRef {
        EntityRef::new(self.owner_id, self.entity_id)
    }
}

/// Payload carried by a raw event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Element state notification
    ElementState(ElementStateEvent),
    /// Any other message type on the connection
    Other {
        /// Message type name, for diagnostics
        kind: String,
    },
}

/// An inbound event tagged with the set id it is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Set id of the subscription this event belongs to
    pub tag: String,
    /// Message body
    pub payload: Payload,
}

impl RawEvent {
    /// Create an event addressed to `tag`.
    pub fn new(tag: impl Into<String>, payload: Payload) -> Self {
        Self {
            tag: tag.into(),
            payload,
        }
    }

    /// Whether this event is addressed to `set_id`.
    pub fn is_from_set(&self, set_id: &str) -> bool {
        self.tag == set_id
    }

    /// Decode the payload into a typed state change.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::MalformedEvent`] when a state payload names an
    /// impossible element (negative owner, element id below -1).
    pub fn decode(&self) -> Result<DecodedEvent> {
        let Payload::ElementState(msg) = &self.payload else {
            return Ok(DecodedEvent::Unrecognized);
        };

        if msg.owner_id < 0 || msg.entity_id < EntityRef::ALL {
            return Err(MonitorError::malformed(format!(
                "state event for invalid element {}/{}",
                msg.owner_id, msg.entity_id
            )));
        }

        Ok(DecodedEvent::StateChange(StateChangeEvent {
            entity: msg.entity(),
            state: ElementState::from_transport(msg.state),
            level: msg.level,
            startup_complete: msg.startup_complete,
        }))
    }
}

/// Result of decoding a raw event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEvent {
    /// A state change for a specific element
    StateChange(StateChangeEvent),
    /// Not a state message
    Unrecognized,
}

/// Typed element state event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChangeEvent {
    /// Element the event describes
    pub entity: EntityRef,
    /// Mapped state
    pub state: ElementState,
    /// Severity level
    pub level: i32,
    /// Whether startup completed
    pub startup_complete: bool,
}

impl StateChangeEvent {
    /// Active is only worth reporting once the element has fully started;
    /// earlier Active notifications flap during activation.
    pub fn is_reportable(&self) -> bool {
        self.state != ElementState::Active || self.startup_complete
    }
}
