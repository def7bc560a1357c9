// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Delivery transitions performed (by target status)
// - Transitions refused (by error code)
// - Notification channel failures that were swallowed
// - Deliveries that found no tracking record to remove
// - Guard operation latency
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the whole service
pub struct Metrics {
    registry: Registry,

    pub delivery_transitions: IntCounterVec,
    pub transit_rejections: IntCounterVec,
    pub notification_failures: IntCounterVec,
    pub tracking_records_missing: IntCounter,
    pub operation_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let delivery_transitions = IntCounterVec::new(
            Opts::new(
                "delivery_transitions_total",
                "Order status transitions performed by the guard",
            ),
            &["to_status"],
        )?;
        registry.register(Box::new(delivery_transitions.clone()))?;

        let transit_rejections = IntCounterVec::new(
            Opts::new(
                "transit_rejections_total",
                "Delivery transitions refused, by error code",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(transit_rejections.clone()))?;

        let notification_failures = IntCounterVec::new(
            Opts::new(
                "notification_failures_total",
                "Best-effort notification failures, by channel",
            ),
            &["channel"],
        )?;
        registry.register(Box::new(notification_failures.clone()))?;

        let tracking_records_missing = IntCounter::new(
            "tracking_records_missing_total",
            "Deliveries completed without a tracking record to remove",
        )?;
        registry.register(Box::new(tracking_records_missing.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "transit_operation_duration_seconds",
                "Guard operation latency",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self {
            registry,
            delivery_transitions,
            transit_rejections,
            notification_failures,
            tracking_records_missing,
            operation_duration,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_transition(&self, to_status: &str) {
        self.delivery_transitions
            .with_label_values(&[to_status])
            .inc();
    }

    pub fn record_transit_rejection(&self, reason: &str) {
        self.transit_rejections.with_label_values(&[reason]).inc();
    }

    pub fn record_notification_failure(&self, channel: &str) {
        self.notification_failures
            .with_label_values(&[channel])
            .inc();
    }

    pub fn record_tracking_missing(&self) {
        self.tracking_records_missing.inc();
    }

    pub fn observe_operation(&self, operation: &str, duration_secs: f64) {
        self.operation_duration
            .with_label_values(&[operation])
            .observe(duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert!(metrics.registry.gather().len() > 0);
    }

    #[test]
    fn test_counters_track_guard_outcomes() {
        let metrics = Metrics::new().unwrap();

        metrics.record_transition("IN_TRANSIT");
        metrics.record_transition("IN_TRANSIT");
        metrics.record_transition("DELIVERED");
        metrics.record_transit_rejection("ActiveTripExists");
        metrics.record_notification_failure("push");
        metrics.record_tracking_missing();
        metrics.observe_operation("begin_transit", 0.004);

        assert_eq!(
            metrics
                .delivery_transitions
                .with_label_values(&["IN_TRANSIT"])
                .get(),
            2
        );
        assert_eq!(
            metrics
                .delivery_transitions
                .with_label_values(&["DELIVERED"])
                .get(),
            1
        );
        assert_eq!(
            metrics
                .transit_rejections
                .with_label_values(&["ActiveTripExists"])
                .get(),
            1
        );
        assert_eq!(
            metrics
                .notification_failures
                .with_label_values(&["push"])
                .get(),
            1
        );
        assert_eq!(metrics.tracking_records_missing.get(), 1);
    }

    #[test]
    fn test_rejection_reasons_are_independent_series() {
        let metrics = Metrics::new().unwrap();

        metrics.record_transit_rejection("NotFound");
        metrics.record_transit_rejection("InvalidState");
        metrics.record_transit_rejection("NotFound");

        assert_eq!(
            metrics.transit_rejections.with_label_values(&["NotFound"]).get(),
            2
        );
        assert_eq!(
            metrics
                .transit_rejections
                .with_label_values(&["InvalidState"])
                .get(),
            1
        );
    }
}
