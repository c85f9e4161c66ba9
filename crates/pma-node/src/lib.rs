//! # PMA Node
//!
//! Wiring for the `pma-node` binary: configuration, the JSON-lines input
//! format, the Prometheus event publisher and the input runner.
//!
//! ```text
//! stdin / ops file ──→ runner ──→ SequencerHandle ──→ MessagingService
//!                        │                                 │
//!                        └──→ stdout (receipts)            └──→ MetricsEventPublisher
//! ```

pub mod config;
pub mod metrics_publisher;
pub mod ops;
pub mod runner;

pub use config::{Args, NodeConfig, SelfMessages};
pub use metrics_publisher::MetricsEventPublisher;
pub use ops::{parse_line, OpLine};
pub use runner::{run, RunStats};
