//! Core monitor types.

mod builder;
mod entity;
mod handler;
mod monitor;

pub use builder::MonitorBuilder;
pub use entity::{ElementState, EntityRef, StateChange};
pub use handler::{CleanupPolicy, DeliveryOutcome, StateCallback, StateEventHandler};
pub use monitor::{ElementStateMonitor, MonitorState};
