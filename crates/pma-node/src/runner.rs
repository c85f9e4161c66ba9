//! Feeds parsed input lines through the sequencer and writes receipts.

use std::io::Write;

use anyhow::{Context, Result};
use pma_messaging::events::Receipt;
use pma_messaging::sequencer::SequencerHandle;
use pma_telemetry::{HistogramTimer, BLOCK_APPLY_DURATION, LEDGER_HEIGHT};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::metrics_publisher::{record_query, record_transaction};
use crate::ops::{parse_line, OpLine};

/// Counters for one pass over the input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Transactions submitted, including those inside blocks.
    pub transactions: u64,
    /// Transactions that committed.
    pub committed: u64,
    /// Transactions rejected by the ledger.
    pub rejected: u64,
    /// Queries answered.
    pub queries: u64,
    /// Lines that could not be parsed and were skipped.
    pub skipped_lines: u64,
}

/// Apply every line of `reader` and write one JSON receipt per line to
/// `writer`.
///
/// Malformed lines are logged and skipped. The sequencer stays running.
pub async fn run<R, W>(handle: &SequencerHandle, reader: R, mut writer: W) -> Result<RunStats>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut stats = RunStats::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        line_no += 1;
        let op = match parse_line(line_no, &line) {
            Ok(Some(op)) => op,
            Ok(None) => continue,
            Err(e) => {
                warn!(line = line_no, error = %format!("{e:#}"), "Skipping input line");
                stats.skipped_lines += 1;
                continue;
            }
        };

        match op {
            OpLine::Transaction(tx) => {
                let operation = tx.operation.name();
                let receipt = {
                    let _timer = HistogramTimer::new(&BLOCK_APPLY_DURATION);
                    handle.submit(tx).await?
                };
                record_transaction(operation, &receipt);
                stats.record(&receipt);
                emit(&mut writer, &receipt)?;
            }
            OpLine::Block { block } => {
                let names: Vec<&'static str> =
                    block.iter().map(|tx| tx.operation.name()).collect();
                let receipts = {
                    let _timer = HistogramTimer::new(&BLOCK_APPLY_DURATION);
                    handle.submit_block(block).await?
                };
                debug!(line = line_no, transactions = receipts.len(), "Block applied");
                for (name, receipt) in names.into_iter().zip(&receipts) {
                    record_transaction(name, receipt);
                    stats.record(receipt);
                    emit(&mut writer, receipt)?;
                }
            }
            OpLine::Query { caller, query } => {
                let name = query.name();
                let receipt = handle.query(caller, query).await?;
                record_query(name, &receipt);
                stats.queries += 1;
                emit(&mut writer, &receipt)?;
            }
        }
    }

    writer.flush().context("Failed to flush receipts")?;
    Ok(stats)
}

impl RunStats {
    fn record(&mut self, receipt: &Receipt) {
        self.transactions += 1;
        if receipt.is_ok() {
            self.committed += 1;
        } else {
            self.rejected += 1;
        }
        LEDGER_HEIGHT.set(receipt.height as f64);
    }
}

fn emit<W: Write>(writer: &mut W, receipt: &Receipt) -> Result<()> {
    serde_json::to_writer(&mut *writer, receipt).context("Failed to encode receipt")?;
    writer.write_all(b"\n").context("Failed to write receipt")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pma_messaging::sequencer::Sequencer;
    use pma_messaging::service::create_test_service;
    use serde_json::Value;

    const INPUT: &str = r#"
# two accounts, then a conversation
{"block":[{"caller":"alice","operation":{"op":"register","username":"alice","pubkey":"0x020000000000000000000000000000000000000000000000000000000000000001"}},{"caller":"bob","operation":{"op":"register","username":"bob","pubkey":"0x"}}]}
{"caller":"alice","operation":{"op":"send-message","recipient":"bob","ciphertext":"0x1122"}}
not json
{"caller":"bob","query":{"query":"get-inbox-count","account":"bob"}}
{"caller":"mallory","query":{"query":"get-message","id":1}}
"#;

    async fn run_input(input: &str) -> (RunStats, Vec<Value>) {
        let handle = Sequencer::spawn(create_test_service(), 8).unwrap();
        let mut out = Vec::new();
        let stats = run(&handle, input.as_bytes(), &mut out).await.unwrap();
        handle.shutdown().await.unwrap();
        let receipts = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (stats, receipts)
    }

    #[tokio::test]
    async fn test_run_writes_one_receipt_per_operation() {
        let (stats, receipts) = run_input(INPUT).await;

        assert_eq!(
            stats,
            RunStats {
                transactions: 3,
                committed: 2,
                rejected: 1,
                queries: 2,
                skipped_lines: 1,
            }
        );
        assert_eq!(receipts.len(), 5);

        // Both registrations share block 1; bob's pubkey is empty.
        assert_eq!(receipts[0]["height"], 1);
        assert_eq!(receipts[1]["height"], 1);
        assert_eq!(receipts[1]["outcome"]["Err"]["kind"], "invalid-pubkey-length");

        assert_eq!(receipts[2]["outcome"]["Ok"]["type"], "message-sent");
        assert_eq!(receipts[2]["height"], 2);
        assert_eq!(receipts[3]["outcome"]["Ok"]["count"], 1);
        assert_eq!(receipts[4]["outcome"]["Err"]["kind"], "not-participant");
        assert_eq!(receipts[4]["sequence"], Value::Null);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let (stats, receipts) = run_input("\n# nothing\n").await;
        assert_eq!(stats, RunStats::default());
        assert!(receipts.is_empty());
    }
}
