//! Delivery metrics using OpenTelemetry.

use crate::core::DeliveryOutcome;
use opentelemetry::metrics::{Counter, Meter};

/// Counters for what happens to events delivered to monitors.
///
/// Cloning is cheap; every monitor built with the same `MonitorMetrics`
/// reports into the same instruments.
///
/// # Examples
///
/// ```rust,no_run
/// use element_monitor::core::DeliveryOutcome;
/// use element_monitor::metrics::MonitorMetrics;
/// use opentelemetry::global;
///
/// let metrics = MonitorMetrics::new(global::meter("element-monitor"));
/// metrics.record(DeliveryOutcome::Fired);
/// ```
#[derive(Clone)]
pub struct MonitorMetrics {
    events_received: Counter<u64>,
    events_discarded: Counter<u64>,
    changes_fired: Counter<u64>,
    duplicates_suppressed: Counter<u64>,
    callback_failures: Counter<u64>,
    handler_failures: Counter<u64>,
    cleanups_triggered: Counter<u64>,
    pending_dropped: Counter<u64>,
}

impl MonitorMetrics {
    /// Create the instruments on `meter`.
    pub fn new(meter: Meter) -> Self {
        let events_received = meter
            .u64_counter("element_monitor.events.received")
            .with_description("Events delivered to an active subscription")
            .build();

        let events_discarded = meter
            .u64_counter("element_monitor.events.discarded")
            .with_description("Events not addressed to or not about the watched element")
            .build();

        let changes_fired = meter
            .u64_counter("element_monitor.changes.fired")
            .with_description("State changes reported to consumers")
            .build();

        let duplicates_suppressed = meter
            .u64_counter("element_monitor.changes.duplicates")
            .with_description("State events suppressed because nothing changed")
            .build();

        let callback_failures = meter
            .u64_counter("element_monitor.callback.failures")
            .with_description("Consumer callbacks that panicked")
            .build();

        let handler_failures = meter
            .u64_counter("element_monitor.handler.failures")
            .with_description("Events the handler failed to process")
            .build();

        let cleanups_triggered = meter
            .u64_counter("element_monitor.cleanup.triggered")
            .with_description("Subscription removals triggered by Stopped or Deleted")
            .build();

        let pending_dropped = meter
            .u64_counter("element_monitor.pending.dropped")
            .with_description("Oldest pending events evicted to make room for newer ones")
            .build();

        Self {
            events_received,
            events_discarded,
            changes_fired,
            duplicates_suppressed,
            callback_failures,
            handler_failures,
            cleanups_triggered,
            pending_dropped,
        }
    }

    /// Count one delivery outcome.
    pub fn record(&self, outcome: DeliveryOutcome) {
        let counter = match outcome {
            DeliveryOutcome::Received => &self.events_received,
            DeliveryOutcome::Discarded => &self.events_discarded,
            DeliveryOutcome::Fired => &self.changes_fired,
            DeliveryOutcome::Duplicate => &self.duplicates_suppressed,
            DeliveryOutcome::CallbackFailed => &self.callback_failures,
            DeliveryOutcome::HandlerFailed => &self.handler_failures,
            DeliveryOutcome::CleanupTriggered => &self.cleanups_triggered,
            DeliveryOutcome::PendingDropped => &self.pending_dropped,
        };
        counter.add(1, &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::global;

    #[test]
    fn test_record_every_outcome() {
        let metrics = MonitorMetrics::new(global::meter("test"));
        for outcome in [
            DeliveryOutcome::Received,
            DeliveryOutcome::Discarded,
            DeliveryOutcome::Fired,
            DeliveryOutcome::Duplicate,
            DeliveryOutcome::CallbackFailed,
            DeliveryOutcome::HandlerFailed,
            DeliveryOutcome::CleanupTriggered,
            DeliveryOutcome::PendingDropped,
        ] {
            metrics.record(outcome);
        }
    }

    #[test]
    fn test_metrics_clone() {
        let metrics = MonitorMetrics::new(global::meter("test"));
        let metrics2 = metrics.clone();
        metrics.record(DeliveryOutcome::Fired);
        metrics2.record(DeliveryOutcome::Fired);
    }
}
