//! # Operation Schema
//!
//! Payloads exchanged with the ledger: the operations a caller submits, the
//! outputs and receipts it gets back, and the domain events emitted for
//! each committed write.
//!
//! ## Caller Identity
//!
//! Payloads carry no caller field of their own. The caller lives on the
//! enclosing [`Transaction`] (or query envelope) and is supplied by the
//! authentication layer.
//!
//! ## JSON Shape
//!
//! ```text
//! {"caller":"ST1..","operation":{"op":"send-message","recipient":"ST2..","ciphertext":"0x1122"}}
//! {"caller":"ST2..","query":{"query":"get-inbox-count","account":"ST2.."}}
//! ```

use crate::domain::entities::{Message, Profile};
use crate::domain::value_objects::{AccountId, Bytes, MessageId};
use crate::errors::{ErrorKind, MessagingError};
use serde::{Deserialize, Serialize};

// =============================================================================
// INBOUND (caller -> ledger)
// =============================================================================

/// State-changing operations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Operation {
    /// Create or overwrite the caller's profile.
    Register {
        /// Display name.
        username: String,
        /// Compressed public key.
        pubkey: Bytes,
    },
    /// Append a message to the ledger and to the recipient's inbox.
    SendMessage {
        /// Destination account.
        recipient: AccountId,
        /// Opaque payload.
        ciphertext: Bytes,
        /// Optional auxiliary reference.
        #[serde(default)]
        media: Option<Bytes>,
    },
}

impl Operation {
    /// Operation name as used on the wire and in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::SendMessage { .. } => "send-message",
        }
    }
}

/// Read-only queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "kebab-case")]
pub enum Query {
    /// Number of messages ever addressed to `account`.
    GetInboxCount { account: AccountId },
    /// Message id at `index` in `account`'s inbox.
    GetInboxMessageId { account: AccountId, index: u64 },
    /// Full message record, participants only.
    GetMessage { id: MessageId },
    /// Profile registered by `account`, if any.
    GetProfile { account: AccountId },
    /// Highest allocated message id (0 when the ledger is empty).
    GetLastMessageId,
    /// Up to `limit` inbox ids of `account` starting at `offset`.
    GetInboxPage {
        account: AccountId,
        offset: u64,
        limit: u64,
    },
}

impl Query {
    /// Query name as used on the wire, in logs and in metrics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetInboxCount { .. } => "get-inbox-count",
            Self::GetInboxMessageId { .. } => "get-inbox-message-id",
            Self::GetMessage { .. } => "get-message",
            Self::GetProfile { .. } => "get-profile",
            Self::GetLastMessageId => "get-last-message-id",
            Self::GetInboxPage { .. } => "get-inbox-page",
        }
    }
}

/// A state-changing operation with its authenticated caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Authenticated caller.
    pub caller: AccountId,
    /// Operation to apply.
    pub operation: Operation,
}

impl Transaction {
    /// Creates a transaction.
    pub fn new(caller: impl Into<AccountId>, operation: Operation) -> Self {
        Self {
            caller: caller.into(),
            operation,
        }
    }

    /// `register` from `caller`.
    pub fn register(
        caller: impl Into<AccountId>,
        username: impl Into<String>,
        pubkey: impl Into<Bytes>,
    ) -> Self {
        Self::new(
            caller,
            Operation::Register {
                username: username.into(),
                pubkey: pubkey.into(),
            },
        )
    }

    /// `send-message` from `caller` without media.
    pub fn send_message(
        caller: impl Into<AccountId>,
        recipient: impl Into<AccountId>,
        ciphertext: impl Into<Bytes>,
    ) -> Self {
        Self::new(
            caller,
            Operation::SendMessage {
                recipient: recipient.into(),
                ciphertext: ciphertext.into(),
                media: None,
            },
        )
    }
}

// =============================================================================
// OUTBOUND (ledger -> caller)
// =============================================================================

/// Successful operation or query output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OperationOutput {
    /// `register` committed.
    Registered,
    /// `send-message` committed with the new id.
    MessageSent { id: MessageId },
    /// `get-inbox-count` result.
    InboxCount { count: u64 },
    /// `get-inbox-message-id` result.
    InboxMessageId { id: MessageId },
    /// `get-message` result.
    Message { message: Message },
    /// `get-profile` result.
    Profile { profile: Option<Profile> },
    /// `get-last-message-id` result.
    LastMessageId { id: u64 },
    /// `get-inbox-page` result.
    InboxPage { ids: Vec<MessageId> },
}

/// Serializable error returned to callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Taxonomy kind.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl From<&MessagingError> for ErrorPayload {
    fn from(err: &MessagingError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<MessagingError> for ErrorPayload {
    fn from(err: MessagingError) -> Self {
        Self::from(&err)
    }
}

/// Result of one sequenced transaction or query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Position in the total order of transactions. `None` for queries,
    /// which are not part of the order.
    pub sequence: Option<u64>,
    /// Ledger height the call executed at.
    pub height: u64,
    /// Caller the call executed for.
    pub caller: AccountId,
    /// Output or error.
    pub outcome: Result<OperationOutput, ErrorPayload>,
}

impl Receipt {
    /// Returns true if the call succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Error kind, if the call failed.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.outcome.as_ref().err().map(|e| e.kind)
    }
}

// =============================================================================
// DOMAIN EVENTS
// =============================================================================

/// Emitted once per committed write. Carries no ciphertext.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum MessagingEvent {
    /// A profile was created or overwritten.
    ProfileRegistered {
        owner: AccountId,
        username: String,
        height: u64,
    },
    /// A message was appended.
    MessageSent {
        id: MessageId,
        sender: AccountId,
        recipient: AccountId,
        /// Position of the message in the recipient's inbox.
        inbox_index: u64,
        ciphertext_len: usize,
        has_media: bool,
        height: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_json_shape() {
        let json = r#"{"caller":"alice","operation":{"op":"send-message","recipient":"bob","ciphertext":"0x112233445566"}}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.caller, AccountId::from("alice"));
        match tx.operation {
            Operation::SendMessage {
                recipient,
                ciphertext,
                media,
            } => {
                assert_eq!(recipient, AccountId::from("bob"));
                assert_eq!(ciphertext.len(), 6);
                assert!(media.is_none());
            }
            other => panic!("unexpected operation: {other:?}"),
        }
    }

    #[test]
    fn test_query_json_shape() {
        let query: Query =
            serde_json::from_str(r#"{"query":"get-inbox-message-id","account":"bob","index":0}"#)
                .unwrap();
        assert_eq!(query.name(), "get-inbox-message-id");

        let query: Query = serde_json::from_str(r#"{"query":"get-last-message-id"}"#).unwrap();
        assert_eq!(query, Query::GetLastMessageId);
    }

    #[test]
    fn test_error_payload_from_error() {
        let payload = ErrorPayload::from(MessagingError::SelfMessage);
        assert_eq!(payload.kind, ErrorKind::SelfMessage);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "self-message");
    }

    #[test]
    fn test_event_has_no_payload_bytes() {
        let event = MessagingEvent::MessageSent {
            id: MessageId::FIRST,
            sender: "alice".into(),
            recipient: "bob".into(),
            inbox_index: 0,
            ciphertext_len: 6,
            has_media: false,
            height: 1,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "message-sent");
        assert!(json.get("ciphertext").is_none());
    }
}
