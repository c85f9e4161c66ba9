//! # Error Types
//!
//! The fixed error taxonomy of the messaging ledger, plus the storage and
//! codec errors it wraps. Every error is returned as a value; nothing in the
//! ledger panics on caller input.

use crate::domain::value_objects::MessageId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// MESSAGING ERRORS
// =============================================================================

/// Errors returned by ledger operations.
///
/// `NotParticipant` and `MessageNotFound` are kept distinct. Because ids are
/// sequential and public, a non-participant can tell that an id exists from
/// which of the two it receives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessagingError {
    /// Username longer than the configured maximum.
    #[error("invalid username length: {len} > {max} bytes")]
    InvalidUsernameLength { len: usize, max: usize },

    /// Username contains a byte outside printable ASCII.
    #[error("invalid username: byte 0x{byte:02x} at offset {offset} is not printable ASCII")]
    InvalidUsernameCharset { offset: usize, byte: u8 },

    /// Public key is not exactly the required length.
    #[error("invalid pubkey length: {len} != {expected} bytes")]
    InvalidPubkeyLength { len: usize, expected: usize },

    /// Ciphertext longer than the configured maximum.
    #[error("ciphertext too long: {len} > {max} bytes")]
    CiphertextTooLong { len: usize, max: usize },

    /// Media reference longer than the configured maximum.
    #[error("media too long: {len} > {max} bytes")]
    MediaTooLong { len: usize, max: usize },

    /// Recipient is not a well-formed account identifier.
    #[error("invalid recipient identifier ({len} bytes)")]
    InvalidRecipient { len: usize },

    /// Sender and recipient are the same account under the reject policy.
    #[error("sender and recipient are the same account")]
    SelfMessage,

    /// Inbox index at or beyond the inbox size.
    #[error("inbox index out of range: {index} >= {count}")]
    IndexOutOfRange { index: u64, count: u64 },

    /// No message with this id has been stored.
    #[error("message not found: {0}")]
    MessageNotFound(MessageId),

    /// Caller is neither sender nor recipient of the message.
    #[error("caller is not a participant of message {id}")]
    NotParticipant { id: MessageId },

    /// Backing store or record codec failure. Nothing was committed.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl MessagingError {
    /// Stable taxonomy kind for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUsernameLength { .. } => ErrorKind::InvalidUsernameLength,
            Self::InvalidUsernameCharset { .. } => ErrorKind::InvalidUsernameCharset,
            Self::InvalidPubkeyLength { .. } => ErrorKind::InvalidPubkeyLength,
            Self::CiphertextTooLong { .. } => ErrorKind::CiphertextTooLong,
            Self::MediaTooLong { .. } => ErrorKind::MediaTooLong,
            Self::InvalidRecipient { .. } => ErrorKind::InvalidRecipient,
            Self::SelfMessage => ErrorKind::SelfMessage,
            Self::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Self::MessageNotFound(_) => ErrorKind::MessageNotFound,
            Self::NotParticipant { .. } => ErrorKind::NotParticipant,
            Self::Storage(_) => ErrorKind::StorageFailure,
        }
    }

    /// Returns true if the error was caused by caller input rather than by
    /// the backing store.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

impl From<SerializationError> for MessagingError {
    fn from(err: SerializationError) -> Self {
        Self::Storage(StoreError::Serialization {
            message: err.message,
        })
    }
}

/// Error kinds with stable kebab-case codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    InvalidUsernameLength,
    InvalidUsernameCharset,
    InvalidPubkeyLength,
    CiphertextTooLong,
    MediaTooLong,
    InvalidRecipient,
    SelfMessage,
    IndexOutOfRange,
    MessageNotFound,
    NotParticipant,
    StorageFailure,
}

impl ErrorKind {
    /// Kebab-case code, as exposed to callers and metrics.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidUsernameLength => "invalid-username-length",
            Self::InvalidUsernameCharset => "invalid-username-charset",
            Self::InvalidPubkeyLength => "invalid-pubkey-length",
            Self::CiphertextTooLong => "ciphertext-too-long",
            Self::MediaTooLong => "media-too-long",
            Self::InvalidRecipient => "invalid-recipient",
            Self::SelfMessage => "self-message",
            Self::IndexOutOfRange => "index-out-of-range",
            Self::MessageNotFound => "message-not-found",
            Self::NotParticipant => "not-participant",
            Self::StorageFailure => "storage-failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// STORAGE ERRORS
// =============================================================================

/// Key-value store errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// I/O failure in a persistent backend.
    #[error("I/O error: {message}")]
    Io { message: String },

    /// A stored record could not be encoded or decoded.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// A stored value has an unexpected shape.
    #[error("corrupted value at key {key}")]
    Corrupted { key: String },

    /// A ledger counter cannot be advanced any further.
    #[error("counter overflow at key {key}")]
    CounterOverflow { key: String },
}

/// Record codec error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("serialization error: {message}")]
pub struct SerializationError {
    pub message: String,
}

// =============================================================================
// CONFIGURATION ERRORS
// =============================================================================

/// Rejected [`crate::domain::entities::MessagingConfig`] values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A limit is above the ledger constant it may only tighten.
    #[error("{field} = {value} exceeds the ledger limit {max}")]
    LimitExceeded {
        field: &'static str,
        value: u64,
        max: u64,
    },

    /// A limit of zero would reject every call.
    #[error("{field} must be at least 1")]
    ZeroLimit { field: &'static str },
}

// =============================================================================
// SEQUENCER ERRORS
// =============================================================================

/// Errors from the sequencer handle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SequencerError {
    /// The sequencer task has stopped and accepts no more commands.
    #[error("sequencer is not running")]
    Stopped,

    /// The sequencer dropped the reply channel before answering.
    #[error("sequencer dropped the reply")]
    ReplyDropped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes() {
        let err = MessagingError::CiphertextTooLong { len: 513, max: 512 };
        assert_eq!(err.kind().code(), "ciphertext-too-long");
        assert!(err.to_string().contains("513"));

        assert_eq!(
            MessagingError::NotParticipant { id: MessageId::new(1) }.kind().code(),
            "not-participant"
        );
        assert_eq!(
            MessagingError::MessageNotFound(MessageId::new(9)).kind().code(),
            "message-not-found"
        );
    }

    #[test]
    fn test_kind_serde_matches_code() {
        let json = serde_json::to_string(&ErrorKind::IndexOutOfRange).unwrap();
        assert_eq!(json, "\"index-out-of-range\"");
    }

    #[test]
    fn test_storage_errors_are_not_caller_errors() {
        let err: MessagingError = StoreError::Io {
            message: "disk".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        assert!(!err.is_caller_error());
        assert!(MessagingError::SelfMessage.is_caller_error());
    }

    #[test]
    fn test_serialization_error_maps_to_storage() {
        let err: MessagingError = SerializationError {
            message: "truncated".into(),
        }
        .into();
        assert!(matches!(err, MessagingError::Storage(StoreError::Serialization { .. })));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::LimitExceeded {
            field: "max_ciphertext_len",
            value: 4096,
            max: 512,
        };
        assert_eq!(err.to_string(), "max_ciphertext_len = 4096 exceeds the ledger limit 512");
    }
}
