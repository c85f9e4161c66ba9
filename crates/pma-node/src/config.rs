//! # Node Configuration
//!
//! Precedence, highest first: command-line flags, environment variables,
//! the optional JSON limits file, built-in defaults. An environment
//! variable only applies when its flag was not given.
//!
//! | Variable | Fills in |
//! |----------|----------|
//! | `PMA_DATA_DIR` | `--data-dir` |
//! | `PMA_SELF_MESSAGES` | `--self-messages` (`allow` or `reject`) |
//! | `PMA_CHANNEL_CAPACITY` | `--capacity` |

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use pma_messaging::domain::{MessagingConfig, SelfMessagePolicy};
use tracing::{info, warn};

/// PMA Node: private messaging ledger
#[derive(Parser, Debug, Clone)]
#[command(name = "pma-node")]
#[command(about = "Applies JSON-lines ledger operations and prints one receipt per line")]
pub struct Args {
    /// Operations file (JSON lines); reads stdin when omitted
    pub input: Option<PathBuf>,

    /// Data directory for a durable ledger; in-memory when omitted [env: PMA_DATA_DIR]
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// JSON file with ledger limits
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Whether accounts may message themselves [env: PMA_SELF_MESSAGES]
    #[arg(long, value_enum)]
    pub self_messages: Option<SelfMessages>,

    /// Sequencer queue capacity [default: 256] [env: PMA_CHANNEL_CAPACITY]
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Log filter (overrides PMA_LOG_LEVEL / RUST_LOG)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Print Prometheus metrics to stderr on exit
    #[arg(long)]
    pub metrics: bool,
}

/// CLI spelling of [`SelfMessagePolicy`].
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfMessages {
    Allow,
    Reject,
}

impl From<SelfMessages> for SelfMessagePolicy {
    fn from(value: SelfMessages) -> Self {
        match value {
            SelfMessages::Allow => SelfMessagePolicy::Allow,
            SelfMessages::Reject => SelfMessagePolicy::Reject,
        }
    }
}

/// Resolved node configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// Operations file, or stdin.
    pub input: Option<PathBuf>,
    /// Durable ledger directory, or in-memory.
    pub data_dir: Option<PathBuf>,
    /// Ledger limits and policies.
    pub messaging: MessagingConfig,
    /// Sequencer queue capacity.
    pub channel_capacity: usize,
    /// Print metrics on exit.
    pub print_metrics: bool,
}

impl NodeConfig {
    /// Name of the ledger file inside the data directory.
    pub const LEDGER_FILE: &'static str = "ledger.db";

    /// Sequencer queue capacity when neither flag nor environment sets one.
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

    /// Path of the ledger file, when running durably.
    pub fn ledger_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(Self::LEDGER_FILE))
    }

    /// Resolve configuration from parsed arguments and the process
    /// environment.
    pub fn load(args: Args) -> Result<Self> {
        Self::resolve(args, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from parsed arguments and an arbitrary
    /// variable source.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut messaging = match &args.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => MessagingConfig::default(),
        };

        // Environment fills in flags that were not given
        let data_dir = match args.data_dir {
            Some(dir) => Some(dir),
            None => lookup("PMA_DATA_DIR").map(|dir| {
                info!(data_dir = %dir, "Using data directory from environment");
                PathBuf::from(dir)
            }),
        };

        let policy = match args.self_messages {
            Some(policy) => Some(policy.into()),
            None => match lookup("PMA_SELF_MESSAGES") {
                Some(policy) => Some(parse_policy(&policy)?),
                None => None,
            },
        };
        if let Some(policy) = policy {
            messaging.self_message_policy = policy;
        }

        let channel_capacity = match args.capacity {
            Some(capacity) => capacity,
            None => match lookup("PMA_CHANNEL_CAPACITY") {
                Some(capacity) => capacity.parse().unwrap_or_else(|_| {
                    warn!(value = %capacity, "Ignoring invalid PMA_CHANNEL_CAPACITY");
                    Self::DEFAULT_CHANNEL_CAPACITY
                }),
                None => Self::DEFAULT_CHANNEL_CAPACITY,
            },
        };

        if channel_capacity == 0 {
            bail!("channel capacity must be at least 1");
        }
        messaging.validate().context("Invalid ledger limits")?;

        Ok(NodeConfig {
            input: args.input,
            data_dir,
            messaging,
            channel_capacity,
            print_metrics: args.metrics,
        })
    }
}

fn parse_policy(value: &str) -> Result<SelfMessagePolicy> {
    match value.to_lowercase().as_str() {
        "allow" => Ok(SelfMessagePolicy::Allow),
        "reject" => Ok(SelfMessagePolicy::Reject),
        other => bail!("PMA_SELF_MESSAGES must be \"allow\" or \"reject\", got {other:?}"),
    }
}
