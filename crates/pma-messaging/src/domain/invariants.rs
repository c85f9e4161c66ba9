//! # Domain Invariants
//!
//! Precondition checks run by the dispatcher before any state is touched.
//! Each check returns the taxonomy error for the first violation found.
//!
//! | Check | Operation | Error kind |
//! |-------|-----------|------------|
//! | `check_username` | register | `invalid-username-length`, `invalid-username-charset` |
//! | `check_pubkey` | register | `invalid-pubkey-length` |
//! | `check_ciphertext` | send-message | `ciphertext-too-long` |
//! | `check_media` | send-message | `media-too-long` |
//! | `check_recipient` | send-message | `invalid-recipient` |
//! | `check_self_message` | send-message | `self-message` |
//! | `check_participant` | get-message | `not-participant` |

use crate::domain::entities::{Message, MessagingConfig, SelfMessagePolicy};
use crate::domain::value_objects::AccountId;
use crate::errors::MessagingError;

/// Ledger-wide limits.
pub mod limits {
    /// Maximum username length in bytes.
    pub const MAX_USERNAME_LEN: usize = 32;
    /// Exact length of a compressed secp256k1 public key.
    pub const PUBKEY_LEN: usize = 33;
    /// Maximum ciphertext length in bytes.
    pub const MAX_CIPHERTEXT_LEN: usize = 512;
    /// Maximum media reference length in bytes.
    pub const MAX_MEDIA_LEN: usize = 256;
    /// Maximum account identifier length in bytes.
    pub const MAX_ACCOUNT_ID_LEN: usize = 128;
    /// Largest inbox page served in one query.
    pub const MAX_INBOX_PAGE: u64 = 100;
}

/// Username must fit the length bound and be printable ASCII (0x20..=0x7E).
pub fn check_username(username: &str, config: &MessagingConfig) -> Result<(), MessagingError> {
    if username.len() > config.max_username_len {
        return Err(MessagingError::InvalidUsernameLength {
            len: username.len(),
            max: config.max_username_len,
        });
    }

    if let Some((offset, byte)) = username
        .bytes()
        .enumerate()
        .find(|(_, b)| !(0x20..=0x7E).contains(b))
    {
        return Err(MessagingError::InvalidUsernameCharset { offset, byte });
    }

    Ok(())
}

/// Public key must be exactly [`limits::PUBKEY_LEN`] bytes. Its curve
/// encoding is not inspected.
pub fn check_pubkey(pubkey: &[u8]) -> Result<(), MessagingError> {
    if pubkey.len() != limits::PUBKEY_LEN {
        return Err(MessagingError::InvalidPubkeyLength {
            len: pubkey.len(),
            expected: limits::PUBKEY_LEN,
        });
    }
    Ok(())
}

/// Ciphertext may be empty, but not longer than the configured maximum.
pub fn check_ciphertext(ciphertext: &[u8], config: &MessagingConfig) -> Result<(), MessagingError> {
    if ciphertext.len() > config.max_ciphertext_len {
        return Err(MessagingError::CiphertextTooLong {
            len: ciphertext.len(),
            max: config.max_ciphertext_len,
        });
    }
    Ok(())
}

/// Media, when present, must fit the configured maximum.
pub fn check_media(media: Option<&[u8]>, config: &MessagingConfig) -> Result<(), MessagingError> {
    match media {
        Some(media) if media.len() > config.max_media_len => Err(MessagingError::MediaTooLong {
            len: media.len(),
            max: config.max_media_len,
        }),
        _ => Ok(()),
    }
}

/// Recipient must be a well-formed account identifier.
pub fn check_recipient(recipient: &AccountId, config: &MessagingConfig) -> Result<(), MessagingError> {
    if !recipient.is_well_formed(config.max_account_id_len) {
        return Err(MessagingError::InvalidRecipient {
            len: recipient.len(),
        });
    }
    Ok(())
}

/// Under [`SelfMessagePolicy::Reject`], sender and recipient must differ.
pub fn check_self_message(
    caller: &AccountId,
    recipient: &AccountId,
    policy: SelfMessagePolicy,
) -> Result<(), MessagingError> {
    if policy == SelfMessagePolicy::Reject && caller == recipient {
        return Err(MessagingError::SelfMessage);
    }
    Ok(())
}

/// Only the sender and the recipient may read a message.
pub fn check_participant(message: &Message, caller: &AccountId) -> Result<(), MessagingError> {
    if !message.is_participant(caller) {
        return Err(MessagingError::NotParticipant { id: message.id });
    }
    Ok(())
}
