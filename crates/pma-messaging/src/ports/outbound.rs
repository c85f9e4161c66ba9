//! # Driven Ports (SPI - Outbound)
//!
//! Interfaces the ledger depends on. Adapters implement them:
//! - `KeyValueStore`: the three ledger tables and counters
//! - `RecordSerializer`: encoding of stored records
//! - `EventPublisher`: projection of committed writes to observers

use crate::errors::{SerializationError, StoreError};
use crate::events::MessagingEvent;
use serde::de::DeserializeOwned;
use serde::Serialize;

// =============================================================================
// KEY-VALUE STORE
// =============================================================================

/// Result type for prefix scans.
pub type ScanResult = Vec<(Vec<u8>, Vec<u8>)>;

/// Abstract key-value storage backing the Registry, Ledger and Inbox Index.
///
/// The ledger only mutates through [`KeyValueStore::atomic_batch_write`], so
/// every operation commits all of its effects or none of them.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Put a single key-value pair.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Delete a key.
    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch are applied, or NONE are.
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, StoreError>;

    /// All pairs whose key starts with `prefix`, sorted by key.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, StoreError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}

// =============================================================================
// RECORD SERIALIZER
// =============================================================================

/// Encoding of stored records.
///
/// Must be deterministic: the same record always encodes to the same bytes.
pub trait RecordSerializer: Send + Sync {
    /// Encode a record.
    fn encode<T: Serialize>(&self, record: &T) -> Result<Vec<u8>, SerializationError>;

    /// Decode a record.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SerializationError>;
}

// =============================================================================
// EVENT PUBLISHER
// =============================================================================

/// Receives one event per committed write.
///
/// Called after the batch is committed; a publisher cannot veto or roll
/// back a write.
pub trait EventPublisher: Send + Sync {
    /// Publish a domain event.
    fn publish(&self, event: &MessagingEvent);
}
