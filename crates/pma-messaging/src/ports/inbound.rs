//! # Driving Ports (API - Inbound)
//!
//! The operation surface of the ledger. Argument order follows the
//! published operation table and is stable.

use crate::domain::entities::{CallContext, Message, Profile};
use crate::domain::value_objects::{AccountId, MessageId};
use crate::errors::MessagingError;

/// Primary API of the messaging ledger.
///
/// Writes take `&mut self`: one writer at a time, each write committed as a
/// single atomic batch. Reads take `&self` and never mutate ledger state.
///
/// ## Usage
///
/// ```ignore
/// let ctx = CallContext::new("alice", height);
/// service.register(&ctx, "alice", &pubkey)?;
/// let id = service.send_message(&ctx, &"bob".into(), &ciphertext, None)?;
/// ```
pub trait MessagingApi {
    /// Create or overwrite the caller's profile.
    ///
    /// # Errors
    ///
    /// * `InvalidUsernameLength` - username longer than 32 bytes
    /// * `InvalidUsernameCharset` - username not printable ASCII
    /// * `InvalidPubkeyLength` - pubkey not exactly 33 bytes
    fn register(
        &mut self,
        ctx: &CallContext,
        username: &str,
        pubkey: &[u8],
    ) -> Result<(), MessagingError>;

    /// Append a message from the caller to `recipient`.
    ///
    /// Registration is not required for either party.
    ///
    /// # Returns
    ///
    /// The new message id, one greater than the previous maximum.
    ///
    /// # Errors
    ///
    /// * `CiphertextTooLong` - ciphertext longer than 512 bytes
    /// * `MediaTooLong` - media reference over the configured bound
    /// * `InvalidRecipient` - malformed recipient identifier
    /// * `SelfMessage` - caller == recipient under the reject policy
    fn send_message(
        &mut self,
        ctx: &CallContext,
        recipient: &AccountId,
        ciphertext: &[u8],
        media: Option<&[u8]>,
    ) -> Result<MessageId, MessagingError>;

    /// Number of messages ever addressed to `account` (0 if none).
    fn get_inbox_count(&self, account: &AccountId) -> Result<u64, MessagingError>;

    /// Message id at `index` in `account`'s inbox.
    ///
    /// # Errors
    ///
    /// * `IndexOutOfRange` - `index >= count`
    fn get_inbox_message_id(
        &self,
        account: &AccountId,
        index: u64,
    ) -> Result<MessageId, MessagingError>;

    /// Full message record, visible to its sender and recipient only.
    ///
    /// # Errors
    ///
    /// * `MessageNotFound` - no message with this id
    /// * `NotParticipant` - caller is neither sender nor recipient
    fn get_message(&self, ctx: &CallContext, id: MessageId) -> Result<Message, MessagingError>;

    /// Profile registered by `account`, if any.
    fn get_profile(&self, account: &AccountId) -> Result<Option<Profile>, MessagingError>;

    /// Highest allocated message id, 0 before the first send.
    fn get_last_message_id(&self) -> Result<u64, MessagingError>;

    /// Up to `limit` ids of `account`'s inbox, starting at `offset`.
    ///
    /// The page is capped by the configured maximum. An offset at or past
    /// the inbox size yields an empty page.
    fn get_inbox_page(
        &self,
        account: &AccountId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<MessageId>, MessagingError>;
}
