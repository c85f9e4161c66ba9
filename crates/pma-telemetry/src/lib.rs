//! # PMA Telemetry
//!
//! Observability for the private messaging ledger.
//!
//! ## Components
//!
//! - **Logs**: `tracing` subscriber with env filter, pretty or JSON output
//! - **Metrics**: Prometheus counters and gauges, rendered as text
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pma_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // Logs and metrics are now being collected
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `pma-node` | Service name in log lines |
//! | `PMA_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `PMA_CONSOLE_OUTPUT` | `true` | Write log lines |
//! | `PMA_JSON_LOGS` | `false` | JSON log lines |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging};
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle, BLOCK_APPLY_DURATION,
    CIPHERTEXT_BYTES, LAST_MESSAGE_ID, LEDGER_HEIGHT, MESSAGES_SENT, OPERATIONS_REJECTED,
    PROFILES_REGISTERED, QUERIES_SERVED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first so that startup logs can already count
    let metrics = register_metrics()?;
    init_logging(&config)?;

    Ok(TelemetryGuard { metrics })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    metrics: MetricsHandle,
}

impl TelemetryGuard {
    /// Registered metrics.
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_inc_macro() {
        let before = PROFILES_REGISTERED.get();
        metric_inc!(PROFILES_REGISTERED);
        metric_inc!(QUERIES_SERVED, &["get-inbox-count", "ok"]);
        assert!(PROFILES_REGISTERED.get() >= before + 1.0);
        assert!(QUERIES_SERVED.with_label_values(&["get-inbox-count", "ok"]).get() >= 1.0);
    }
}
