//! File-based settings source.

use super::SettingsSource;
use crate::error::{MonitorError, Result};
use config::{File, FileFormat, Source};
use std::collections::HashMap;
use std::path::PathBuf;

/// Settings file in YAML, TOML or JSON, detected from the extension.
///
/// # Examples
///
/// ```rust,no_run
/// use element_monitor::settings::FileSource;
///
/// let source = FileSource::new("config/monitor.yaml").optional();
/// ```
pub struct FileSource {
    path: PathBuf,
    priority: i32,
    required: bool,
}

impl FileSource {
    /// Create a required file source.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            priority: 100,
            required: true,
        }
    }

    /// Skip the file silently when it does not exist.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Override the default file priority of 100.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    fn format(&self) -> Result<FileFormat> {
        match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Ok(FileFormat::Yaml),
            Some("toml") => Ok(FileFormat::Toml),
            Some("json") => Ok(FileFormat::Json),
            Some(other) => Err(MonitorError::SettingsError(format!(
                "{}: .{} files are not supported (use .yaml, .toml or .json)",
                self.path.display(),
                other
            ))),
            None => Err(MonitorError::SettingsError(format!(
                "{}: no extension to infer the format from",
                self.path.display()
            ))),
        }
    }
}

impl SettingsSource for FileSource {
    fn load(&self) -> Result<HashMap<String, config::Value>> {
        let format = self.format()?;

        if !self.path.is_file() {
            if self.required {
                return Err(MonitorError::SettingsError(format!(
                    "{}: settings file not found",
                    self.path.display()
                )));
            }
            tracing::debug!(path = %self.path.display(), "optional settings file absent");
            return Ok(HashMap::new());
        }

        let values = File::from(self.path.as_path())
            .format(format)
            .collect()
            .map_err(|e| MonitorError::SettingsError(format!("{}: {}", self.path.display(), e)))?;
        Ok(values.into_iter().collect())
    }

    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_extension() {
        assert!(matches!(FileSource::new("a.yml").format(), Ok(FileFormat::Yaml)));
        assert!(matches!(FileSource::new("a.toml").format(), Ok(FileFormat::Toml)));
        assert!(matches!(FileSource::new("a.json").format(), Ok(FileFormat::Json)));
        assert!(FileSource::new("monitor.ini").format().is_err());
        assert!(FileSource::new("monitor").format().is_err());
    }

    #[test]
    fn test_load_yaml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("monitor.yaml");
        fs::write(&path, "handle_suffix: \"-Watch\"\npending_capacity: 8\n").unwrap();

        let map = FileSource::new(&path).load().unwrap();
        assert!(map.contains_key("handle_suffix"));
        assert!(map.contains_key("pending_capacity"));
    }

    #[test]
    fn test_missing_required_file() {
        assert!(FileSource::new("/nonexistent/monitor.yaml").load().is_err());
    }

    #[test]
    fn test_missing_optional_file() {
        let map = FileSource::new("/nonexistent/monitor.yaml")
            .optional()
            .load()
            .unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_name_and_priority() {
        let source = FileSource::new("monitor.yaml").with_priority(200);
        assert_eq!(source.priority(), 200);
        assert!(source.name().contains("monitor.yaml"));
    }
}
