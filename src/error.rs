//! Error types for element-monitor.

/// Result type alias for element-monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors that can occur while configuring or running a monitor.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Failed to load settings from a source.
    #[error("Failed to load settings: {0}")]
    SettingsError(String),

    /// Settings were loaded but failed validation.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// An inbound event carried a payload that cannot describe a real element.
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// A call into the subscription registry failed.
    #[error("Registry operation failed: {0}")]
    Registry(String),

    /// A non-exclusive registration collided with an existing one.
    #[error("Subscription already registered for {source_id} ({set_id})")]
    DuplicateSubscription {
        /// Source identifier of the colliding registration
        source_id: String,
        /// Set identifier of the colliding registration
        set_id: String,
    },

    /// The monitor builder was missing required input.
    #[error("Monitor misconfigured: {0}")]
    Builder(String),
}

impl MonitorError {
    /// Create a registry error from anything printable.
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Create a malformed event error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedEvent(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_subscription_message() {
        let err = MonitorError::DuplicateSubscription {
            source_id: "script-1".to_string(),
            set_id: "script-1-12/34-State".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Subscription already registered for script-1 (script-1-12/34-State)"
        );
    }

    #[test]
    fn test_helpers() {
        assert!(matches!(MonitorError::registry("down"), MonitorError::Registry(m) if m == "down"));
        assert!(matches!(MonitorError::malformed("bad"), MonitorError::MalformedEvent(m) if m == "bad"));
    }
}
