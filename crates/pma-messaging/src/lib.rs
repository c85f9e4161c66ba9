//! # PMA Messaging - Private Messaging Ledger
//!
//! A replicated ledger for end-to-end encrypted messages. Clients encrypt
//! off-ledger; the ledger stores opaque ciphertext, indexes it per
//! recipient and hands records back only to their two participants.
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Identity Registry | `p:` keys | account -> username + compressed pubkey |
//! | Message Ledger | `m:` keys | sequential id -> immutable message |
//! | Inbox Index | `i:` / `c:` keys | recipient -> ordered message ids |
//! | Access Control Dispatcher | `service.rs` | validation, atomic commit, read gating |
//! | Sequencer | `sequencer.rs` | total order, block heights |
//!
//! ## Guarantees
//!
//! | Guarantee | Enforcement Location |
//! |-----------|---------------------|
//! | Ids strictly increase from 1, no gaps | `service.rs` - `send_message_inner()` |
//! | Every message in exactly one inbox slot | `service.rs` - single batch per send |
//! | Inbox slots never reorder | `domain/keys.rs` - append-only index keys |
//! | Only participants read a message | `domain/invariants.rs` - `check_participant()` |
//! | Rejected ops change nothing | `service.rs` - validate before any read or write |
//!
//! ## Limits
//!
//! | Limit | Value |
//! |-------|-------|
//! | `MAX_USERNAME_LEN` | 32 bytes |
//! | `PUBKEY_LEN` | 33 bytes (exact) |
//! | `MAX_CIPHERTEXT_LEN` | 512 bytes |
//! | `MAX_MEDIA_LEN` | 256 bytes |
//! | `MAX_INBOX_PAGE` | 100 ids |
//!
//! ## Usage Example
//!
//! ```ignore
//! use pma_messaging::prelude::*;
//!
//! let handle = Sequencer::spawn(create_test_service(), 64)?;
//! handle.submit(Transaction::register("alice", "alice", pubkey)).await?;
//! handle.submit(Transaction::send_message("alice", "bob", ciphertext)).await?;
//!
//! let receipt = handle
//!     .query("bob", Query::GetInboxCount { account: "bob".into() })
//!     .await?;
//! ```

// Crate-level lints
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod errors;
pub mod events;
pub mod ports;
pub mod sequencer;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain
    pub use crate::domain::entities::{
        CallContext, Message, MessagingConfig, Profile, SelfMessagePolicy,
    };
    pub use crate::domain::invariants::limits;
    pub use crate::domain::keys::KeyPrefix;
    pub use crate::domain::value_objects::{AccountId, Bytes, MessageId};

    // Ports
    pub use crate::ports::inbound::MessagingApi;
    pub use crate::ports::outbound::{
        BatchOperation, EventPublisher, KeyValueStore, RecordSerializer,
    };

    // Events
    pub use crate::events::{
        ErrorPayload, MessagingEvent, Operation, OperationOutput, Query, Receipt, Transaction,
    };

    // Errors
    pub use crate::errors::{
        ConfigError, ErrorKind, MessagingError, SequencerError, StoreError,
    };

    // Adapters
    pub use crate::adapters::{
        BincodeRecordSerializer, DataDirLock, FileBackedKVStore, InMemoryKVStore,
        NoopEventPublisher, RecordingEventPublisher, TracingEventPublisher,
    };

    // Service
    pub use crate::sequencer::{Sequencer, SequencerHandle, SequencerSummary};
    pub use crate::service::{
        create_test_service, create_test_service_with_config, MessagingDependencies,
        MessagingService, ServiceStats,
    };
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Subsystem name.
pub const SUBSYSTEM_NAME: &str = "Private Messaging";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_exports() {
        use prelude::*;
        let _ = MessagingConfig::default();
        assert_eq!(limits::MAX_CIPHERTEXT_LEN, 512);
        assert_eq!(MessageId::FIRST.value(), 1);
    }
}
