//! # Domain Entities
//!
//! Records held by the Identity Registry and the Message Ledger, plus the
//! call context and configuration every operation runs under.

use crate::domain::invariants::limits;
use crate::domain::value_objects::{AccountId, Bytes, MessageId};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

// =============================================================================
// PROFILE
// =============================================================================

/// Public identity of a registered account.
///
/// At most one per account. Registering again overwrites it in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Account that owns this profile.
    pub owner: AccountId,
    /// Display name, printable ASCII. Not unique across accounts.
    pub username: String,
    /// Compressed public key used by clients for off-ledger encryption.
    pub pubkey: Bytes,
    /// Ledger height of the most recent registration.
    pub registered_at: u64,
}

// =============================================================================
// MESSAGE
// =============================================================================

/// An immutable ledger record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Sequential id, starting at 1.
    pub id: MessageId,
    /// Account that sent the message.
    pub sender: AccountId,
    /// Account the message is addressed to.
    pub recipient: AccountId,
    /// Opaque payload. Never decrypted or inspected by the ledger.
    pub ciphertext: Bytes,
    /// Optional opaque auxiliary reference.
    pub media: Option<Bytes>,
    /// Ledger height at which the message was stored.
    pub height: u64,
}

impl Message {
    /// Returns true if `account` is the sender or the recipient.
    #[must_use]
    pub fn is_participant(&self, account: &AccountId) -> bool {
        self.sender == *account || self.recipient == *account
    }
}

// =============================================================================
// CALL CONTEXT
// =============================================================================

/// Who is calling, and at which ledger height.
///
/// The caller identity comes from the authentication layer and is trusted
/// as given.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Authenticated caller.
    pub caller: AccountId,
    /// Current ledger height.
    pub height: u64,
}

impl CallContext {
    /// Creates a call context.
    pub fn new(caller: impl Into<AccountId>, height: u64) -> Self {
        Self {
            caller: caller.into(),
            height,
        }
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Whether an account may send a message to itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelfMessagePolicy {
    /// Self-messages are stored like any other message.
    #[default]
    Allow,
    /// Self-messages are rejected with `self-message`.
    Reject,
}

/// Limits and policies applied by the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Maximum username length in bytes.
    pub max_username_len: usize,
    /// Maximum ciphertext length in bytes.
    pub max_ciphertext_len: usize,
    /// Maximum media reference length in bytes.
    pub max_media_len: usize,
    /// Maximum account identifier length in bytes.
    pub max_account_id_len: usize,
    /// Largest page returned by `get-inbox-page`.
    pub max_inbox_page: u64,
    /// Self-messaging policy.
    pub self_message_policy: SelfMessagePolicy,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            max_username_len: limits::MAX_USERNAME_LEN,
            max_ciphertext_len: limits::MAX_CIPHERTEXT_LEN,
            max_media_len: limits::MAX_MEDIA_LEN,
            max_account_id_len: limits::MAX_ACCOUNT_ID_LEN,
            max_inbox_page: limits::MAX_INBOX_PAGE,
            self_message_policy: SelfMessagePolicy::Allow,
        }
    }
}

impl MessagingConfig {
    /// Checks that no limit is looser than the ledger constant of the same
    /// name. Account ids and inbox pages must also allow at least 1.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bounds = [
            ("max_username_len", self.max_username_len as u64, limits::MAX_USERNAME_LEN as u64, false),
            ("max_ciphertext_len", self.max_ciphertext_len as u64, limits::MAX_CIPHERTEXT_LEN as u64, false),
            ("max_media_len", self.max_media_len as u64, limits::MAX_MEDIA_LEN as u64, false),
            ("max_account_id_len", self.max_account_id_len as u64, limits::MAX_ACCOUNT_ID_LEN as u64, true),
            ("max_inbox_page", self.max_inbox_page, limits::MAX_INBOX_PAGE, true),
        ];

        for (field, value, max, non_zero) in bounds {
            if value > max {
                return Err(ConfigError::LimitExceeded { field, value, max });
            }
            if non_zero && value == 0 {
                return Err(ConfigError::ZeroLimit { field });
            }
        }
        Ok(())
    }

    /// Default limits with self-messages rejected.
    #[must_use]
    pub fn rejecting_self_messages() -> Self {
        Self {
            self_message_policy: SelfMessagePolicy::Reject,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> Message {
        Message {
            id: MessageId::FIRST,
            sender: AccountId::from("alice"),
            recipient: AccountId::from("bob"),
            ciphertext: Bytes::from(vec![1, 2, 3]),
            media: None,
            height: 1,
        }
    }

    #[test]
    fn test_participants() {
        let message = sample_message();
        assert!(message.is_participant(&AccountId::from("alice")));
        assert!(message.is_participant(&AccountId::from("bob")));
        assert!(!message.is_participant(&AccountId::from("carol")));
    }

    #[test]
    fn test_config_defaults_match_limits() {
        let config = MessagingConfig::default();
        assert_eq!(config.max_username_len, 32);
        assert_eq!(config.max_ciphertext_len, 512);
        assert_eq!(config.self_message_policy, SelfMessagePolicy::Allow);
    }

    #[test]
    fn test_config_partial_json() {
        let config: MessagingConfig =
            serde_json::from_str(r#"{"self_message_policy":"reject"}"#).unwrap();
        assert_eq!(config.self_message_policy, SelfMessagePolicy::Reject);
        assert_eq!(config.max_media_len, limits::MAX_MEDIA_LEN);
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(MessagingConfig::default().validate(), Ok(()));
        assert_eq!(MessagingConfig::rejecting_self_messages().validate(), Ok(()));

        // Tighter limits are fine; usernames and media may be disabled.
        let tight = MessagingConfig {
            max_ciphertext_len: 64,
            max_media_len: 0,
            max_inbox_page: 1,
            ..MessagingConfig::default()
        };
        assert_eq!(tight.validate(), Ok(()));

        let loose: MessagingConfig =
            serde_json::from_str(r#"{"max_ciphertext_len":4096}"#).unwrap();
        assert_eq!(
            loose.validate(),
            Err(ConfigError::LimitExceeded {
                field: "max_ciphertext_len",
                value: 4096,
                max: 512,
            })
        );

        let empty_pages: MessagingConfig = serde_json::from_str(r#"{"max_inbox_page":0}"#).unwrap();
        assert_eq!(
            empty_pages.validate(),
            Err(ConfigError::ZeroLimit { field: "max_inbox_page" })
        );
    }
}
