// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - KV operations by outcome (ok, not_found, already_exists, fault)
// - Operation latency
// - Transaction write conflicts that were retried
// - Events appended to the log
// - Storage circuit breaker state
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub operations_total: IntCounterVec,
    pub operation_duration: HistogramVec,
    pub transaction_conflicts: IntCounterVec,
    pub events_appended: IntCounterVec,
    pub circuit_breaker_state: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let operations_total = IntCounterVec::new(
            Opts::new("kv_operations_total", "Total KV operations by outcome"),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new("kv_operation_duration_seconds", "KV operation duration")
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        let transaction_conflicts = IntCounterVec::new(
            Opts::new(
                "kv_transaction_conflicts_total",
                "Write conflicts retried inside a transaction",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(transaction_conflicts.clone()))?;

        let events_appended = IntCounterVec::new(
            Opts::new("kv_events_appended_total", "Events appended to the log"),
            &["operation"],
        )?;
        registry.register(Box::new(events_appended.clone()))?;

        let circuit_breaker_state = IntGauge::new(
            "circuit_breaker_state",
            "Storage circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        Ok(Self {
            registry,
            operations_total,
            operation_duration,
            transaction_conflicts,
            events_appended,
            circuit_breaker_state,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record a finished KV operation
    pub fn record_operation(&self, operation: &str, outcome: &str, duration_secs: f64) {
        self.operations_total.with_label_values(&[operation, outcome]).inc();
        self.operation_duration.with_label_values(&[operation]).observe(duration_secs);
    }

    pub fn record_conflict(&self, operation: &str) {
        self.transaction_conflicts.with_label_values(&[operation]).inc();
    }

    pub fn record_append(&self, operation: &str) {
        self.events_appended.with_label_values(&[operation]).inc();
    }

    pub fn update_circuit_breaker_state(&self, state: i64) {
        self.circuit_breaker_state.set(state);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
