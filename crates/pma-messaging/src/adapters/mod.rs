//! # Adapters Module
//!
//! Concrete implementations of the outbound ports.
//!
//! ## Modules
//!
//! - `storage`: in-memory and file-backed key-value stores
//! - `serializer`: bincode record codec
//! - `publisher`: in-process event publishers
//! - `lock`: data directory locking (single process per ledger)

pub mod lock;
pub mod publisher;
pub mod serializer;
pub mod storage;

pub use lock::{DataDirLock, LockError};
pub use publisher::{NoopEventPublisher, RecordingEventPublisher, TracingEventPublisher};
pub use serializer::BincodeRecordSerializer;
pub use storage::{FileBackedKVStore, InMemoryKVStore};
