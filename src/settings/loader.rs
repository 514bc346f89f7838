//! Merges settings sources into one MonitorSettings.

use super::{EnvSource, FileSource, MonitorSettings, SettingsSource};
use crate::error::{MonitorError, Result};
use std::path::PathBuf;

/// Loads [`MonitorSettings`] from layered sources.
///
/// Sources are merged lowest priority first, so higher priority values
/// override. Keys nobody sets keep their defaults.
///
/// # Examples
///
/// ```rust,no_run
/// use element_monitor::settings::SettingsLoader;
///
/// # fn example() -> element_monitor::error::Result<()> {
/// let settings = SettingsLoader::new()
///     .with_file("config/monitor.yaml")
///     .with_env_overrides("ELEMENT_MONITOR", "__")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct SettingsLoader {
    sources: Vec<Box<dyn SettingsSource>>,
}

impl SettingsLoader {
    /// Create a loader with no sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required settings file.
    pub fn with_file(self, path: impl Into<PathBuf>) -> Self {
        self.with_source(FileSource::new(path))
    }

    /// Add environment variables with `prefix` and nested-key `separator`.
    pub fn with_env_overrides(self, prefix: &str, separator: &str) -> Self {
        self.with_source(EnvSource::new(prefix, separator))
    }

    /// Add a custom source.
    pub fn with_source<S: SettingsSource + 'static>(mut self, source: S) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Names of the sources in merge order.
    pub fn source_names(&self) -> Vec<String> {
        let mut sorted: Vec<_> = self.sources.iter().collect();
        sorted.sort_by_key(|s| s.priority());
        sorted.iter().map(|s| s.name()).collect()
    }

    /// Merge every source and validate the result.
    ///
    /// # Errors
    ///
    /// Returns an error if a source fails to load, the merged values do not
    /// deserialize, or validation fails.
    pub fn load(&self) -> Result<MonitorSettings> {
        if self.sources.is_empty() {
            return Ok(MonitorSettings::default());
        }

        let mut sorted: Vec<_> = self.sources.iter().collect();
        sorted.sort_by_key(|s| s.priority());

        let mut builder = config::Config::builder();
        for source in sorted {
            let values = source.load().map_err(|e| {
                MonitorError::SettingsError(format!("Failed to load source '{}': {}", source.name(), e))
            })?;
            tracing::debug!(source = %source.name(), keys = values.len(), "settings source loaded");

            for (key, value) in values {
                builder = builder.set_override(&key, value).map_err(|e| {
                    MonitorError::SettingsError(format!(
                        "Failed to merge source '{}': {}",
                        source.name(),
                        e
                    ))
                })?;
            }
        }

        let settings: MonitorSettings = builder
            .build()
            .map_err(|e| MonitorError::SettingsError(format!("Failed to build settings: {}", e)))?
            .try_deserialize()
            .map_err(|e| MonitorError::SettingsError(format!("Failed to deserialize settings: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }
}
