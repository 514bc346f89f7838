//! Settings from environment variables.

use super::SettingsSource;
use crate::error::{MonitorError, Result};
use config::{Environment, Source};
use std::collections::HashMap;

/// Settings from prefixed environment variables.
///
/// The separator splits the prefix from the key and nests keys, so with
/// prefix `ELEMENT_MONITOR` and separator `__` the variable
/// `ELEMENT_MONITOR__PENDING_CAPACITY=64` sets `pending_capacity`.
///
/// # Examples
///
/// ```rust
/// use element_monitor::settings::{EnvSource, SettingsSource};
///
/// let source = EnvSource::new("ELEMENT_MONITOR", "__");
/// assert_eq!(source.priority(), 300);
/// ```
pub struct EnvSource {
    prefix: String,
    separator: String,
    priority: i32,
}

impl EnvSource {
    /// Create a source reading `{prefix}{separator}*` variables.
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            separator: separator.into(),
            priority: 300,
        }
    }

    /// Override the default environment priority of 300.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl SettingsSource for EnvSource {
    fn load(&self) -> Result<HashMap<String, config::Value>> {
        let values = Environment::with_prefix(&self.prefix)
            .prefix_separator(&self.separator)
            .separator(&self.separator)
            .try_parsing(true)
            .collect()
            .map_err(|e| MonitorError::SettingsError(format!("environment {}: {}", self.name(), e)))?;
        Ok(values.into_iter().collect())
    }

    fn name(&self) -> String {
        format!("env:{}{}*", self.prefix, self.separator)
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_shows_variable_pattern() {
        assert_eq!(EnvSource::new("APP", "__").name(), "env:APP__*");
    }

    #[test]
    fn test_load_without_matching_vars() {
        let map = EnvSource::new("ELEMENT_MONITOR_TEST_UNSET_PREFIX", "__")
            .load()
            .unwrap();
        assert!(map.is_empty());
    }
}
