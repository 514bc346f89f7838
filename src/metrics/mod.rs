//! Built-in metrics for monitor deliveries.
//!
//! Provides OpenTelemetry counters tracking:
//! - Events received and discarded
//! - Changes reported and duplicates suppressed
//! - Callback and handler failures
//! - Self-cleanup removals
//! - Pending-queue drops
//!
//! # Examples
//!
//! ```rust,no_run
//! use element_monitor::prelude::*;
//! use element_monitor::metrics::MonitorMetrics;
//! use opentelemetry::global;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<()> {
//! let registry = Arc::new(InMemoryRegistry::new());
//! let monitor = ElementStateMonitor::builder(registry, LocalConnection::shared("session-1"))
//!     .source_id("script-1")
//!     .selection(EntityRef::new(12, 34))
//!     .with_metrics(MonitorMetrics::new(global::meter("my-app")))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod monitor_metrics;

pub use monitor_metrics::MonitorMetrics;
