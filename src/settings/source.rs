//! Settings source trait.

use crate::error::Result;
use std::collections::HashMap;

/// A layer of settings values.
///
/// Implement this trait to pull settings from somewhere other than files
/// and environment variables.
pub trait SettingsSource: Send + Sync {
    /// Load this layer as a raw key-value map.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or parsed.
    fn load(&self) -> Result<HashMap<String, config::Value>>;

    /// Human-readable name, for logging.
    fn name(&self) -> String;

    /// Higher priority layers override lower ones.
    ///
    /// Defaults: files 100, environment 300.
    fn priority(&self) -> i32 {
        100
    }
}
