//! Applicability check for inbound events.

use super::message::{DecodedEvent, RawEvent, StateChangeEvent};
use crate::core::EntityRef;
use crate::error::Result;
use std::sync::Arc;

/// Decides whether a raw event belongs to one subscription.
///
/// Runs once per inbound event per active monitor, so every check is a
/// constant-time comparison.
#[derive(Debug, Clone)]
pub struct EventMatcher {
    set_id: Arc<str>,
    target: EntityRef,
}

impl EventMatcher {
    /// Create a matcher for events tagged `set_id` about `target`.
    pub fn new(set_id: impl Into<Arc<str>>, target: EntityRef) -> Self {
        Self {
            set_id: set_id.into(),
            target,
        }
    }

    /// Set id this matcher accepts.
    pub fn set_id(&self) -> &str {
        &self.set_id
    }

    /// Element or owner this matcher targets.
    pub fn target(&self) -> EntityRef {
        self.target
    }

    /// Return the typed event when `event` is addressed to this subscription
    /// and concerns the target; `None` for anything else.
    ///
    /// # Errors
    ///
    /// Propagates decode errors for malformed state payloads.
    pub fn matches(&self, event: &RawEvent) -> Result<Option<StateChangeEvent>> {
        if !event.is_from_set(&self.set_id) {
            return Ok(None);
        }

        match event.decode()? {
            DecodedEvent::StateChange(ev) if self.applies_to(&ev.entity) => Ok(Some(ev)),
            _ => Ok(None),
        }
    }

    /// Whether an event about `entity` concerns the target.
    pub fn applies_to(&self, entity: &EntityRef) -> bool {
        if self.target.is_owner_wide() {
            return self.target.owner_id == EntityRef::ALL || self.target.owner_id == entity.owner_id;
        }
        *entity == self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ElementState;
    use crate::event::{ElementStateEvent, Payload};

    fn event(tag: &str, entity: EntityRef) -> RawEvent {
        RawEvent::new(
            tag,
            Payload::ElementState(ElementStateEvent::new(entity, ElementState::Active, true)),
        )
    }

    #[test]
    fn test_foreign_tag_is_discarded() {
        let matcher = EventMatcher::new("mine", EntityRef::new(1, 2));
        assert!(matcher.matches(&event("theirs", EntityRef::new(1, 2))).unwrap().is_none());
    }

    #[test]
    fn test_exact_match() {
        let matcher = EventMatcher::new("mine", EntityRef::new(1, 2));
        let ev = matcher.matches(&event("mine", EntityRef::new(1, 2))).unwrap();
        assert_eq!(ev.map(|e| e.entity), Some(EntityRef::new(1, 2)));
        assert!(matcher.matches(&event("mine", EntityRef::new(1, 3))).unwrap().is_none());
        assert!(matcher.matches(&event("mine", EntityRef::new(2, 2))).unwrap().is_none());
    }

    #[test]
    fn test_owner_wide_match() {
        let matcher = EventMatcher::new("mine", EntityRef::owner_wide(1));
        assert!(matcher.matches(&event("mine", EntityRef::new(1, 99))).unwrap().is_some());
        assert!(matcher.matches(&event("mine", EntityRef::new(2, 99))).unwrap().is_none());
    }

    #[test]
    fn test_platform_wide_match() {
        let matcher = EventMatcher::new("mine", EntityRef::new(-1, -1));
        assert!(matcher.matches(&event("mine", EntityRef::new(5, 6))).unwrap().is_some());
        assert!(matcher.matches(&event("mine", EntityRef::new(8, 1))).unwrap().is_some());
    }

    #[test]
    fn test_unrecognized_payload() {
        let matcher = EventMatcher::new("mine", EntityRef::owner_wide(1));
        let other = RawEvent::new(
            "mine",
            Payload::Other {
                kind: "AlarmEventMessage".to_string(),
            },
        );
        assert!(matcher.matches(&other).unwrap().is_none());
    }

    #[test]
    fn test_malformed_payload_errors() {
        let matcher = EventMatcher::new("mine", EntityRef::owner_wide(1));
        let bad = RawEvent::new(
            "mine",
            Payload::ElementState(ElementStateEvent {
                owner_id: -4,
                entity_id: 1,
                state: 1,
                level: 0,
                startup_complete: true,
            }),
        );
        assert!(matcher.matches(&bad).is_err());
    }
}
