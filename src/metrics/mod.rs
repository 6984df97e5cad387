// Private module declaration
mod server;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for the fulfillment engine
// ============================================================================
//
// - Order placement and status transitions
// - Rejected commands, by command and reason
// - Baking promotions and current queue size
// - Command latency
// - Outbox publishing
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub orders_placed: IntCounter,
    pub status_transitions: IntCounterVec,
    pub commands_rejected: IntCounterVec,
    pub command_duration: HistogramVec,

    pub baking_promotions: IntCounter,
    pub baking_queue_products: IntGauge,

    pub outbox_published: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_placed = IntCounter::new("orders_placed_total", "Total orders placed")?;
        registry.register(Box::new(orders_placed.clone()))?;

        let status_transitions = IntCounterVec::new(
            Opts::new("order_status_transitions_total", "Order status transitions"),
            &["from", "to"],
        )?;
        registry.register(Box::new(status_transitions.clone()))?;

        let commands_rejected = IntCounterVec::new(
            Opts::new("order_commands_rejected_total", "Commands rejected by the engine"),
            &["command", "reason"],
        )?;
        registry.register(Box::new(commands_rejected.clone()))?;

        let command_duration = HistogramVec::new(
            HistogramOpts::new("order_command_duration_seconds", "Engine command duration")
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
            &["command"],
        )?;
        registry.register(Box::new(command_duration.clone()))?;

        let baking_promotions = IntCounter::new(
            "baking_promotions_total",
            "Orders promoted to baking by the baking-complete cascade",
        )?;
        registry.register(Box::new(baking_promotions.clone()))?;

        let baking_queue_products = IntGauge::new(
            "baking_queue_products",
            "Distinct products in the baking queue at last read",
        )?;
        registry.register(Box::new(baking_queue_products.clone()))?;

        let outbox_published = IntCounter::new(
            "outbox_events_published_total",
            "Order events handed to the publisher",
        )?;
        registry.register(Box::new(outbox_published.clone()))?;

        Ok(Self {
            registry,
            orders_placed,
            status_transitions,
            commands_rejected,
            command_duration,
            baking_promotions,
            baking_queue_products,
            outbox_published,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_transition(&self, from: &str, to: &str) {
        self.status_transitions.with_label_values(&[from, to]).inc();
    }

    pub fn record_rejection(&self, command: &str, reason: &str) {
        self.commands_rejected.with_label_values(&[command, reason]).inc();
    }

    pub fn observe_command(&self, command: &str, duration_secs: f64) {
        self.command_duration.with_label_values(&[command]).observe(duration_secs);
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.orders_placed.inc();
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_transition() {
        let metrics = Metrics::new().unwrap();
        metrics.record_transition("pending", "baking");
        metrics.record_transition("pending", "baking");
        metrics.record_transition("baking", "ready");

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"order_status_transitions_total{from="pending",to="baking"} 2"#));
        assert!(text.contains(r#"order_status_transitions_total{from="baking",to="ready"} 1"#));
    }

    #[test]
    fn test_record_rejection_and_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.record_rejection("advance", "terminal_state");
        metrics.baking_queue_products.set(4);

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"order_commands_rejected_total{command="advance",reason="terminal_state"} 1"#));
        assert!(text.contains("baking_queue_products 4"));
    }
}
