//! # Ports Layer (Middle Hexagon)
//!
//! - **Driving Ports (Inbound)**: `MessagingApi`
//! - **Driven Ports (Outbound)**: `KeyValueStore`, `RecordSerializer`, `EventPublisher`

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
