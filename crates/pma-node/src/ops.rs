//! # Operations Input
//!
//! One JSON value per line. Blank lines and lines starting with `#` are
//! skipped.
//!
//! ```text
//! {"caller":"alice","operation":{"op":"register","username":"alice","pubkey":"0x02.."}}
//! {"caller":"alice","operation":{"op":"send-message","recipient":"bob","ciphertext":"0x1122"}}
//! {"block":[{"caller":"bob","operation":{...}},{"caller":"carol","operation":{...}}]}
//! {"caller":"bob","query":{"query":"get-inbox-count","account":"bob"}}
//! ```

use anyhow::{Context, Result};
use pma_messaging::domain::AccountId;
use pma_messaging::events::{Query, Transaction};
use serde::Deserialize;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OpLine {
    /// Several transactions sequenced at one height.
    Block { block: Vec<Transaction> },
    /// A read-only query.
    Query { caller: AccountId, query: Query },
    /// A single transaction in a block of its own.
    Transaction(Transaction),
}

/// Parse line `line_no` (1-based). `Ok(None)` for blank and comment lines.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<OpLine>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .with_context(|| format!("line {line_no}: not a transaction, block or query"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pma_messaging::events::Operation;

    #[test]
    fn test_transaction_line() {
        let line = r#"{"caller":"alice","operation":{"op":"send-message","recipient":"bob","ciphertext":"0x1122","media":"0x6364"}}"#;
        match parse_line(1, line).unwrap() {
            Some(OpLine::Transaction(tx)) => {
                assert_eq!(tx.caller.as_str(), "alice");
                assert!(matches!(
                    tx.operation,
                    Operation::SendMessage { media: Some(_), .. }
                ));
            }
            other => panic!("unexpected line: {other:?}"),
        }
    }

    #[test]
    fn test_block_line() {
        let line = r#"{"block":[
            {"caller":"alice","operation":{"op":"register","username":"alice","pubkey":"0x02"}},
            {"caller":"bob","operation":{"op":"send-message","recipient":"alice","ciphertext":"0x"}}
        ]}"#
        .replace('\n', " ");
        match parse_line(2, &line).unwrap() {
            Some(OpLine::Block { block }) => assert_eq!(block.len(), 2),
            other => panic!("unexpected line: {other:?}"),
        }
    }

    #[test]
    fn test_query_line() {
        let line = r#"{"caller":"bob","query":{"query":"get-inbox-page","account":"bob","offset":0,"limit":10}}"#;
        match parse_line(3, line).unwrap() {
            Some(OpLine::Query { caller, query }) => {
                assert_eq!(caller.as_str(), "bob");
                assert_eq!(query.name(), "get-inbox-page");
            }
            other => panic!("unexpected line: {other:?}"),
        }
    }

    #[test]
    fn test_skipped_and_invalid_lines() {
        assert_eq!(parse_line(1, "   ").unwrap(), None);
        assert_eq!(parse_line(1, "# setup").unwrap(), None);

        let err = parse_line(7, r#"{"caller":"bob"}"#).unwrap_err();
        assert!(err.to_string().contains("line 7"));

        // Bad hex in a payload is an input error, not a ledger error.
        assert!(parse_line(8, r#"{"caller":"a","operation":{"op":"send-message","recipient":"b","ciphertext":"0xzz"}}"#).is_err());
    }
}
