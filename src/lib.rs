//! # element-monitor
//!
//! Element state monitoring with lock-free change deduplication and automatic
//! subscription cleanup.
//!
//! ## Overview
//!
//! `element-monitor` watches the lifecycle state of managed elements on a
//! remote management platform and tells you only when that state really
//! changes:
//! - Typed decode and O(1) matching of tagged inbound events
//! - Lock-free deduplication of repeated or transient states using `dashmap`
//! - Automatic removal of subscriptions when a watched element stops or is deleted
//! - Callback and handler failures contained on the delivery thread
//!
//! ## Quick Start
//!
//! ```rust
//! use element_monitor::prelude::*;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<()> {
//! let registry = Arc::new(InMemoryRegistry::new());
//! let conn = LocalConnection::shared("session-1");
//!
//! let monitor = ElementStateMonitor::builder(registry.clone(), conn.clone())
//!     .source_id("automation-42")
//!     .selection(EntityRef::new(12, 34))
//!     .build()?;
//!
//! monitor.start(|change| {
//!     println!("element {} is now {}", change.entity(), change.state());
//! })?;
//!
//! // Reported once, however often the platform repeats it.
//! for _ in 0..3 {
//!     registry.deliver(
//!         &conn,
//!         &ElementStateEvent::new(EntityRef::new(12, 34), ElementState::Paused, true),
//!     );
//! }
//!
//! monitor.stop(false);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `metrics`: OpenTelemetry counters for delivery outcomes

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod event;
pub mod registry;
pub mod settings;
pub mod subscription;

#[cfg(feature = "metrics")]
pub mod metrics;

pub use crate::core::{ElementState, ElementStateMonitor, EntityRef, MonitorBuilder, MonitorState, StateChange};

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{ElementState, ElementStateMonitor, EntityRef, MonitorBuilder, MonitorState, StateChange};
    pub use crate::error::{MonitorError, Result};
    pub use crate::event::{ElementStateEvent, Payload, RawEvent};
    pub use crate::registry::{
        CleanupCoordinator, Connection, ConnectionRef, InMemoryRegistry, LocalConnection, SubscriptionRegistry,
    };
    pub use crate::settings::{MonitorSettings, SettingsLoader};
}
