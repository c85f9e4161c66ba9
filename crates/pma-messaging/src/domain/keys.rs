//! # Storage Key Layout
//!
//! The three logical tables (Registry, Ledger, Inbox Index) and the ledger
//! counters share one key-value namespace, separated by prefix.
//!
//! | Prefix | Key | Value |
//! |--------|-----|-------|
//! | `p:` | `p:{account}` | `Profile` |
//! | `m:` | `m:{id:be64}` | `Message` |
//! | `i:` | `i:{len:be16}{account}{index:be64}` | `MessageId` (be64) |
//! | `c:` | `c:{account}` | inbox count (be64) |
//! | `s:` | `s:last-message-id`, `s:height` | be64 |
//!
//! Inbox keys carry the account length so that one account's entries can
//! never share a prefix with another account's.

use crate::domain::value_objects::{AccountId, MessageId};

/// Key namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    /// Identity Registry: account -> Profile.
    Profile,
    /// Message Ledger: id -> Message.
    Message,
    /// Inbox Index: (account, index) -> id.
    InboxEntry,
    /// Inbox sizes: account -> count.
    InboxCount,
    /// Ledger-wide scalars.
    State,
}

impl KeyPrefix {
    /// Byte prefix for this namespace.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            KeyPrefix::Profile => b"p:",
            KeyPrefix::Message => b"m:",
            KeyPrefix::InboxEntry => b"i:",
            KeyPrefix::InboxCount => b"c:",
            KeyPrefix::State => b"s:",
        }
    }

    /// Builds a full key with the given suffix.
    pub fn key(&self, suffix: &[u8]) -> Vec<u8> {
        let mut key = self.as_bytes().to_vec();
        key.extend_from_slice(suffix);
        key
    }

    /// Registry key for an account.
    pub fn profile_key(account: &AccountId) -> Vec<u8> {
        KeyPrefix::Profile.key(account.as_bytes())
    }

    /// Ledger key for a message id.
    pub fn message_key(id: MessageId) -> Vec<u8> {
        KeyPrefix::Message.key(&id.to_be_bytes())
    }

    /// Prefix shared by every inbox entry of one account.
    pub fn inbox_prefix(account: &AccountId) -> Vec<u8> {
        // Account ids are bounded well below u16::MAX by validation; the
        // saturating cast only matters for unvalidated caller ids.
        let len = u16::try_from(account.len()).unwrap_or(u16::MAX);
        let mut key = KeyPrefix::InboxEntry.key(&len.to_be_bytes());
        key.extend_from_slice(account.as_bytes());
        key
    }

    /// Inbox Index key for position `index` of `account`.
    pub fn inbox_entry_key(account: &AccountId, index: u64) -> Vec<u8> {
        let mut key = Self::inbox_prefix(account);
        key.extend_from_slice(&index.to_be_bytes());
        key
    }

    /// Inbox size key for an account.
    pub fn inbox_count_key(account: &AccountId) -> Vec<u8> {
        KeyPrefix::InboxCount.key(account.as_bytes())
    }

    /// Highest allocated message id.
    pub fn last_message_id_key() -> Vec<u8> {
        KeyPrefix::State.key(b"last-message-id")
    }

    /// Height of the last block that committed a write.
    pub fn height_key() -> Vec<u8> {
        KeyPrefix::State.key(b"height")
    }
}

/// Decodes a big-endian u64 value.
pub fn decode_u64(bytes: &[u8]) -> Option<u64> {
    let array: [u8; 8] = bytes.try_into().ok()?;
    Some(u64::from_be_bytes(array))
}

/// Renders a key for error messages and logs.
pub fn display_key(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_keys_sort_by_id() {
        let a = KeyPrefix::message_key(MessageId::new(2));
        let b = KeyPrefix::message_key(MessageId::new(10));
        assert!(a < b);
    }

    #[test]
    fn test_inbox_prefixes_do_not_collide() {
        // "ab" + index must never look like "a" + something.
        let short = KeyPrefix::inbox_prefix(&AccountId::from("a"));
        let long = KeyPrefix::inbox_entry_key(&AccountId::from("ab"), 0);
        assert!(!long.starts_with(&short));
    }

    #[test]
    fn test_inbox_entry_under_prefix() {
        let account = AccountId::from("bob");
        let key = KeyPrefix::inbox_entry_key(&account, 3);
        assert!(key.starts_with(&KeyPrefix::inbox_prefix(&account)));
        assert_eq!(&key[key.len() - 8..], &3u64.to_be_bytes());
    }

    #[test]
    fn test_decode_u64() {
        assert_eq!(decode_u64(&42u64.to_be_bytes()), Some(42));
        assert_eq!(decode_u64(&[1, 2, 3]), None);
    }
}
