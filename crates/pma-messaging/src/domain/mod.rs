//! # Domain Layer (Inner Hexagon)
//!
//! Pure ledger logic: records, limits, precondition checks and the storage
//! key layout. No I/O and no async.

pub mod entities;
pub mod invariants;
pub mod keys;
pub mod value_objects;

pub use entities::*;
pub use invariants::*;
pub use keys::*;
pub use value_objects::*;
