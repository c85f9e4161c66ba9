//! # Value Objects
//!
//! Immutable domain primitives for the messaging ledger.
//! These types are defined by their value, not by identity.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// =============================================================================
// ACCOUNT IDENTIFIER
// =============================================================================

/// Opaque, stable account identifier.
///
/// Supplied by the external authentication layer. The ledger never checks
/// that a caller owns the identifier it presents; it only checks that a
/// recipient identifier is well-formed (see [`AccountId::is_well_formed`]).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Wraps an identifier without validation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the identifier bytes, as used in storage keys.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Length of the identifier in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the identifier is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Well-formed identifiers are 1..=`max_len` bytes of visible ASCII
    /// (0x21..=0x7E), so no whitespace or control bytes.
    #[must_use]
    pub fn is_well_formed(&self, max_len: usize) -> bool {
        !self.0.is_empty()
            && self.0.len() <= max_len
            && self.0.bytes().all(|b| b.is_ascii_graphic())
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// =============================================================================
// MESSAGE ID
// =============================================================================

/// Globally unique message identifier, allocated sequentially from 1.
///
/// Ids are public. Holding an id grants nothing; access to a message is
/// decided by participant identity only.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl MessageId {
    /// The first id ever allocated.
    pub const FIRST: Self = Self(1);

    /// Creates a message id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The id following this one, or `None` on overflow.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Big-endian encoding, so that key order matches id order.
    #[must_use]
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MessageId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// =============================================================================
// BYTES
// =============================================================================

/// Opaque byte string (ciphertext, media reference, public key).
///
/// Human-readable formats (JSON) carry it as a `0x`-prefixed hex string;
/// binary formats carry raw bytes.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    /// Creates an empty byte string.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates bytes from a slice.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Self {
        Self(slice.to_vec())
    }

    /// Returns the underlying slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns the underlying vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Returns the length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `0x`-prefixed lowercase hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }

    /// Parses hex with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(digits).map(Self)
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Payloads may be ciphertext; debug output only shows the size.
        write!(f, "Bytes({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(vec: Vec<u8>) -> Self {
        Self(vec)
    }
}

impl From<&[u8]> for Bytes {
    fn from(slice: &[u8]) -> Self {
        Self(slice.to_vec())
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_hex(&s).map_err(D::Error::custom)
        } else {
            Vec::<u8>::deserialize(deserializer).map(Self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_well_formed() {
        assert!(AccountId::from("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM").is_well_formed(128));
        assert!(AccountId::from("ST1PQ.private-messaging").is_well_formed(128));
        assert!(!AccountId::from("").is_well_formed(128));
        assert!(!AccountId::from("has space").is_well_formed(128));
        assert!(!AccountId::from("tab\there").is_well_formed(128));
        assert!(!AccountId::from("abcdef").is_well_formed(5));
    }

    #[test]
    fn test_message_id_next() {
        assert_eq!(MessageId::default().next(), Some(MessageId::FIRST));
        assert_eq!(MessageId::new(u64::MAX).next(), None);
    }

    #[test]
    fn test_bytes_json_is_hex() {
        let bytes = Bytes::from(vec![0x11, 0x22, 0x33]);
        let json = serde_json::to_string(&bytes).unwrap();
        assert_eq!(json, "\"0x112233\"");

        let back: Bytes = serde_json::from_str("\"112233\"").unwrap();
        assert_eq!(back, bytes);
    }

    #[test]
    fn test_bytes_bincode_is_raw() {
        let bytes = Bytes::from(vec![0xAA; 6]);
        let encoded = bincode::serialize(&bytes).unwrap();
        // u64 length prefix followed by the raw payload
        assert_eq!(encoded.len(), 8 + 6);
        let decoded: Bytes = bincode::deserialize(&encoded).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn test_bytes_debug_hides_content() {
        let bytes = Bytes::from(vec![0x41; 4]);
        assert_eq!(format!("{bytes:?}"), "Bytes(4 bytes)");
    }
}
