//! Builder for constructing ElementStateMonitor instances.

use crate::core::{ElementStateMonitor, EntityRef};
use crate::error::{MonitorError, Result};
use crate::registry::{CleanupCoordinator, ConnectionRef, SubscriptionRegistry};
use crate::settings::MonitorSettings;
use std::sync::Arc;

#[cfg(feature = "metrics")]
use crate::metrics::MonitorMetrics;

/// Builder for an [`ElementStateMonitor`].
///
/// A monitor needs a source (an id, or the element it runs on) and a
/// selection. Everything else defaults from [`MonitorSettings`].
///
/// # Examples
///
/// ```rust
/// use element_monitor::prelude::*;
/// use std::sync::Arc;
///
/// # fn example() -> Result<()> {
/// let registry = Arc::new(InMemoryRegistry::new());
/// let coordinator = Arc::new(CleanupCoordinator::new(registry.clone()));
///
/// let monitor = ElementStateMonitor::builder(registry, LocalConnection::shared("session-1"))
///     .source_id("automation-42")
///     .selection(EntityRef::owner_wide(12))
///     .handle_suffix("-Dashboard")
///     .coordinator(coordinator)
///     .build()?;
///
/// assert_eq!(monitor.set_id(), "automation-42-12/-1-Dashboard");
/// # Ok(())
/// # }
/// ```
pub struct MonitorBuilder {
    registry: Arc<dyn SubscriptionRegistry>,
    connection: ConnectionRef,
    coordinator: Option<Arc<CleanupCoordinator>>,
    source_id: Option<String>,
    source_element: Option<EntityRef>,
    selection: Option<EntityRef>,
    handle_suffix: Option<String>,
    settings: MonitorSettings,
    #[cfg(feature = "metrics")]
    metrics: Option<MonitorMetrics>,
}

impl MonitorBuilder {
    /// Create a builder with default settings.
    pub fn new(registry: Arc<dyn SubscriptionRegistry>, connection: ConnectionRef) -> Self {
        Self {
            registry,
            connection,
            coordinator: None,
            source_id: None,
            source_element: None,
            selection: None,
            handle_suffix: None,
            settings: MonitorSettings::default(),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Identify the monitor's source by id.
    pub fn source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Run the monitor on behalf of an element.
    ///
    /// The element's composite key becomes the source id, so this cannot be
    /// combined with [`source_id`](Self::source_id).
    pub fn source_element(mut self, element: EntityRef) -> Self {
        self.source_element = Some(element);
        self
    }

    /// Element to watch, or `EntityRef::owner_wide(owner)` for all of an owner's elements.
    pub fn selection(mut self, selection: EntityRef) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Override the set id suffix from the settings.
    pub fn handle_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.handle_suffix = Some(suffix.into());
        self
    }

    /// Use loaded settings instead of the defaults.
    pub fn settings(mut self, settings: MonitorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Share a cleanup coordinator with other monitors on the same registry.
    pub fn coordinator(mut self, coordinator: Arc<CleanupCoordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Record delivery outcomes with OpenTelemetry.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: MonitorMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the monitor.
    ///
    /// # Errors
    ///
    /// Returns an error if no selection was given, the source is missing or
    /// given twice, the source id is empty, or the settings fail validation.
    pub fn build(self) -> Result<ElementStateMonitor> {
        let selection = self
            .selection
            .ok_or_else(|| MonitorError::Builder("a selection is required".to_string()))?;

        let source_id = match (self.source_id, self.source_element) {
            (Some(id), None) => id,
            (None, Some(element)) => element.key(),
            (Some(id), Some(element)) => {
                return Err(MonitorError::Builder(format!(
                    "source id '{}' conflicts with source element {}; \
                     subscriptions of an element are keyed by its id",
                    id, element
                )));
            }
            (None, None) => {
                return Err(MonitorError::Builder(
                    "a source id or source element is required".to_string(),
                ));
            }
        };
        if source_id.trim().is_empty() {
            return Err(MonitorError::Builder("source id must not be empty".to_string()));
        }

        let mut settings = self.settings;
        if let Some(suffix) = self.handle_suffix {
            settings.handle_suffix = suffix;
        }
        settings.validate()?;

        let coordinator = self
            .coordinator
            .unwrap_or_else(|| Arc::new(CleanupCoordinator::new(Arc::clone(&self.registry))));

        Ok(ElementStateMonitor::from_parts(
            self.registry,
            coordinator,
            self.connection,
            source_id,
            self.source_element,
            selection,
            settings,
            #[cfg(feature = "metrics")]
            self.metrics,
        ))
    }
}
