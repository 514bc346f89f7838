//! Monitor settings and their layered loading.

mod env;
mod file;
mod loader;
mod source;

pub use env::EnvSource;
pub use file::FileSource;
pub use loader::SettingsLoader;
pub use source::SettingsSource;

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};

/// Tunables shared by the monitors of an application.
///
/// # Examples
///
/// ```rust
/// use element_monitor::settings::MonitorSettings;
///
/// let settings = MonitorSettings::default();
/// assert_eq!(settings.handle_suffix, "-State");
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Appended to every set id
    pub handle_suffix: String,
    /// Ask the registry not to replay current states for owner-wide watches.
    /// Advice for registries that replay; the in-memory registry never does.
    pub skip_initial_events: bool,
    /// Replace an existing registration under the same set id
    pub exclusive: bool,
    /// Capacity of each subscription's pending-event queue
    pub pending_capacity: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            handle_suffix: "-State".to_string(),
            skip_initial_events: true,
            exclusive: true,
            pending_capacity: 1024,
        }
    }
}

impl MonitorSettings {
    /// Check the settings for values no monitor can run with.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidSettings`] for an empty or
    /// whitespace-containing suffix, or a zero queue capacity.
    pub fn validate(&self) -> Result<()> {
        if self.handle_suffix.is_empty() {
            return Err(MonitorError::InvalidSettings(
                "handle_suffix must not be empty".to_string(),
            ));
        }
        if self.handle_suffix.chars().any(char::is_whitespace) {
            return Err(MonitorError::InvalidSettings(format!(
                "handle_suffix '{}' must not contain whitespace",
                self.handle_suffix
            )));
        }
        if self.pending_capacity == 0 {
            return Err(MonitorError::InvalidSettings(
                "pending_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(MonitorSettings::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_suffix() {
        let mut settings = MonitorSettings::default();
        settings.handle_suffix = String::new();
        assert!(settings.validate().is_err());

        settings.handle_suffix = "-My State".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let settings = MonitorSettings {
            pending_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(MonitorError::InvalidSettings(_))));
    }
}
