//! Prometheus metrics for the messaging ledger.
//!
//! All metrics follow the naming convention: `pma_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // REGISTRY METRICS
    // =========================================================================

    /// Profiles created or overwritten
    pub static ref PROFILES_REGISTERED: Counter = Counter::new(
        "pma_registry_profiles_registered_total",
        "Total number of committed register operations"
    ).expect("metric creation failed");

    // =========================================================================
    // LEDGER METRICS
    // =========================================================================

    /// Messages appended to the ledger
    pub static ref MESSAGES_SENT: Counter = Counter::new(
        "pma_ledger_messages_sent_total",
        "Total number of messages stored"
    ).expect("metric creation failed");

    /// Ciphertext bytes appended to the ledger
    pub static ref CIPHERTEXT_BYTES: Counter = Counter::new(
        "pma_ledger_ciphertext_bytes_total",
        "Total ciphertext bytes stored"
    ).expect("metric creation failed");

    /// Highest allocated message id
    pub static ref LAST_MESSAGE_ID: Gauge = Gauge::new(
        "pma_ledger_last_message_id",
        "Highest allocated message id"
    ).expect("metric creation failed");

    /// Current ledger height
    pub static ref LEDGER_HEIGHT: Gauge = Gauge::new(
        "pma_ledger_height",
        "Height of the last sealed block"
    ).expect("metric creation failed");

    // =========================================================================
    // DISPATCHER METRICS
    // =========================================================================

    /// Rejected operations by operation and error kind
    pub static ref OPERATIONS_REJECTED: CounterVec = CounterVec::new(
        Opts::new("pma_dispatcher_operations_rejected_total", "Rejected operations"),
        &["operation", "kind"]
    ).expect("metric creation failed");

    /// Queries by name and outcome
    pub static ref QUERIES_SERVED: CounterVec = CounterVec::new(
        Opts::new("pma_dispatcher_queries_total", "Queries answered"),
        &["query", "outcome"]  // outcome: ok or the error kind
    ).expect("metric creation failed");

    /// Time to apply one block
    pub static ref BLOCK_APPLY_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "pma_sequencer_block_apply_duration_seconds",
            "Time spent applying one block of transactions"
        ).buckets(exponential_buckets(0.0001, 2.0, 12).expect("valid bucket layout"))
    ).expect("metric creation failed");
}

/// Handle proving the metrics are registered.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    registry: Registry,
}

impl MetricsHandle {
    /// Registry holding the ledger metrics.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; metrics that are already registered are
/// left as they are.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Registry
        Box::new(PROFILES_REGISTERED.clone()),
        // Ledger
        Box::new(MESSAGES_SENT.clone()),
        Box::new(CIPHERTEXT_BYTES.clone()),
        Box::new(LAST_MESSAGE_ID.clone()),
        Box::new(LEDGER_HEIGHT.clone()),
        // Dispatcher
        Box::new(OPERATIONS_REJECTED.clone()),
        Box::new(QUERIES_SERVED.clone()),
        Box::new(BLOCK_APPLY_DURATION.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: REGISTRY.clone(),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_twice() {
        assert!(register_metrics().is_ok());
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_encoded_output_names() {
        register_metrics().unwrap();
        MESSAGES_SENT.inc();
        OPERATIONS_REJECTED
            .with_label_values(&["send-message", "ciphertext-too-long"])
            .inc();

        let text = encode_metrics().unwrap();
        assert!(text.contains("pma_ledger_messages_sent_total"));
        assert!(text.contains("kind=\"ciphertext-too-long\""));
    }

    #[test]
    fn test_histogram_timer() {
        let before = BLOCK_APPLY_DURATION.get_sample_count();
        drop(HistogramTimer::new(&BLOCK_APPLY_DURATION));
        assert!(BLOCK_APPLY_DURATION.get_sample_count() > before);
    }
}
