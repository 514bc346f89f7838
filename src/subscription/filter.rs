//! Routing filters attached to a subscription.

use crate::core::EntityRef;
use serde::{Deserialize, Serialize};

/// Selects which state events the registry routes to a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterCriterion {
    /// Every state event on the connection.
    MatchAll {
        /// Ask the registry not to replay current states on subscribe.
        ///
        /// Only registries backed by a platform that replays states act on
        /// this. [`InMemoryRegistry`](crate::registry::InMemoryRegistry)
        /// keeps no current states and never replays, whatever the value.
        skip_initial_events: bool,
    },
    /// Only events for one element.
    MatchExact(EntityRef),
}

impl FilterCriterion {
    /// Whether an event about `entity` passes this filter.
    pub fn accepts(&self, entity: &EntityRef) -> bool {
        match self {
            Self::MatchAll { .. } => true,
            Self::MatchExact(target) => target == entity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_all_accepts_everything() {
        let filter = FilterCriterion::MatchAll {
            skip_initial_events: true,
        };
        assert!(filter.accepts(&EntityRef::new(1, 1)));
        assert!(filter.accepts(&EntityRef::new(900, 7)));
    }

    #[test]
    fn test_match_exact() {
        let filter = FilterCriterion::MatchExact(EntityRef::new(1, 2));
        assert!(filter.accepts(&EntityRef::new(1, 2)));
        assert!(!filter.accepts(&EntityRef::new(1, 3)));
    }
}
