//! # Messaging Service
//!
//! The access-control dispatcher. Every operation is validated in full
//! before state is read, and every write is committed as one atomic batch
//! spanning the Registry, the Ledger and the Inbox Index.
//!
//! ## Write Path
//!
//! ```text
//! validate args ──→ read counters ──→ build batch ──→ atomic_batch_write ──→ publish event
//!      │                  │                                  │
//!      └── caller error   └── storage-failure                └── storage-failure
//!          (no reads)         (nothing written)                  (nothing written)
//! ```
//!
//! ## Logging
//!
//! Ciphertext and media are never logged; only their lengths.

use crate::adapters::{BincodeRecordSerializer, InMemoryKVStore, NoopEventPublisher};
use crate::domain::entities::{CallContext, Message, MessagingConfig, Profile};
use crate::domain::invariants::{
    check_ciphertext, check_media, check_participant, check_pubkey, check_recipient,
    check_self_message, check_username,
};
use crate::domain::keys::{decode_u64, display_key, KeyPrefix};
use crate::domain::value_objects::{AccountId, Bytes, MessageId};
use crate::errors::{MessagingError, StoreError};
use crate::events::{MessagingEvent, Operation, OperationOutput, Query};
use crate::ports::inbound::MessagingApi;
use crate::ports::outbound::{BatchOperation, EventPublisher, KeyValueStore, RecordSerializer};

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, instrument, warn};

/// Dependencies for the Messaging Service.
pub struct MessagingDependencies<KV, RS, EP>
where
    KV: KeyValueStore,
    RS: RecordSerializer,
    EP: EventPublisher,
{
    /// Key-value store backing all three tables.
    pub kv_store: KV,
    /// Record codec.
    pub serializer: RS,
    /// Receiver of committed-write events.
    pub publisher: EP,
}

/// Counters for the Messaging Service.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStats {
    /// Writes committed to the store.
    pub writes_committed: u64,
    /// Writes rejected (caller error or storage failure).
    pub writes_rejected: u64,
    /// Reads answered successfully.
    pub reads_served: u64,
    /// Reads that returned an error.
    pub reads_rejected: u64,
}

#[derive(Debug, Default)]
struct StatsCounters {
    writes_committed: AtomicU64,
    writes_rejected: AtomicU64,
    reads_served: AtomicU64,
    reads_rejected: AtomicU64,
}

impl StatsCounters {
    fn record_write<T>(&self, result: &Result<T, MessagingError>) {
        let counter = match result {
            Ok(_) => &self.writes_committed,
            Err(_) => &self.writes_rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_read<T>(&self, result: &Result<T, MessagingError>) {
        let counter = match result {
            Ok(_) => &self.reads_served,
            Err(_) => &self.reads_rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ServiceStats {
        ServiceStats {
            writes_committed: self.writes_committed.load(Ordering::Relaxed),
            writes_rejected: self.writes_rejected.load(Ordering::Relaxed),
            reads_served: self.reads_served.load(Ordering::Relaxed),
            reads_rejected: self.reads_rejected.load(Ordering::Relaxed),
        }
    }
}

/// The Messaging Service.
///
/// Single writer: mutation requires `&mut self`, so two writes can never
/// interleave. Wrap it in a [`crate::sequencer::Sequencer`] to share it
/// across tasks.
pub struct MessagingService<KV, RS, EP>
where
    KV: KeyValueStore,
    RS: RecordSerializer,
    EP: EventPublisher,
{
    kv_store: KV,
    serializer: RS,
    publisher: EP,
    config: MessagingConfig,
    stats: StatsCounters,
}

impl<KV, RS, EP> MessagingService<KV, RS, EP>
where
    KV: KeyValueStore,
    RS: RecordSerializer,
    EP: EventPublisher,
{
    /// Creates a new service over existing (possibly non-empty) storage.
    pub fn new(deps: MessagingDependencies<KV, RS, EP>, config: MessagingConfig) -> Self {
        info!(
            self_messages = ?config.self_message_policy,
            max_ciphertext_len = config.max_ciphertext_len,
            "[pma] Messaging service initialized"
        );
        Self {
            kv_store: deps.kv_store,
            serializer: deps.serializer,
            publisher: deps.publisher,
            config,
            stats: StatsCounters::default(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &MessagingConfig {
        &self.config
    }

    /// Read access to the backing store.
    pub fn store(&self) -> &KV {
        &self.kv_store
    }

    /// Snapshot of the service counters.
    pub fn stats(&self) -> ServiceStats {
        self.stats.snapshot()
    }

    /// Height of the last sealed block (0 when empty).
    pub fn ledger_height(&self) -> Result<u64, MessagingError> {
        self.read_u64(&KeyPrefix::height_key())
    }

    /// Persists `height` as sealed.
    ///
    /// Committed writes already record their height; this covers blocks in
    /// which every transaction was rejected. Never moves the height back.
    pub fn seal_height(&mut self, height: u64) -> Result<(), MessagingError> {
        if self.ledger_height()? >= height {
            return Ok(());
        }
        self.kv_store.atomic_batch_write(vec![BatchOperation::put(
            KeyPrefix::height_key(),
            height.to_be_bytes(),
        )])?;
        debug!(height, "[pma] Sealed block with no committed writes");
        Ok(())
    }

    /// Applies a state-changing operation for `ctx.caller`.
    pub fn apply(
        &mut self,
        ctx: &CallContext,
        operation: &Operation,
    ) -> Result<OperationOutput, MessagingError> {
        match operation {
            Operation::Register { username, pubkey } => self
                .register(ctx, username, pubkey.as_slice())
                .map(|()| OperationOutput::Registered),
            Operation::SendMessage {
                recipient,
                ciphertext,
                media,
            } => self
                .send_message(
                    ctx,
                    recipient,
                    ciphertext.as_slice(),
                    media.as_ref().map(Bytes::as_slice),
                )
                .map(|id| OperationOutput::MessageSent { id }),
        }
    }

    /// Answers a read-only query for `ctx.caller`.
    pub fn query(&self, ctx: &CallContext, query: &Query) -> Result<OperationOutput, MessagingError> {
        match query {
            Query::GetInboxCount { account } => self
                .get_inbox_count(account)
                .map(|count| OperationOutput::InboxCount { count }),
            Query::GetInboxMessageId { account, index } => self
                .get_inbox_message_id(account, *index)
                .map(|id| OperationOutput::InboxMessageId { id }),
            Query::GetMessage { id } => self
                .get_message(ctx, *id)
                .map(|message| OperationOutput::Message { message }),
            Query::GetProfile { account } => self
                .get_profile(account)
                .map(|profile| OperationOutput::Profile { profile }),
            Query::GetLastMessageId => self
                .get_last_message_id()
                .map(|id| OperationOutput::LastMessageId { id }),
            Query::GetInboxPage {
                account,
                offset,
                limit,
            } => self
                .get_inbox_page(account, *offset, *limit)
                .map(|ids| OperationOutput::InboxPage { ids }),
        }
    }

    // =========================================================================
    // INTERNAL READS
    // =========================================================================

    /// Reads a be64 counter; a missing key reads as 0.
    fn read_u64(&self, key: &[u8]) -> Result<u64, MessagingError> {
        match self.kv_store.get(key)? {
            None => Ok(0),
            Some(bytes) => decode_u64(&bytes).ok_or_else(|| {
                StoreError::Corrupted {
                    key: display_key(key),
                }
                .into()
            }),
        }
    }

    fn load_message(&self, id: MessageId) -> Result<Option<Message>, MessagingError> {
        match self.kv_store.get(&KeyPrefix::message_key(id))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(self.serializer.decode(&bytes)?)),
        }
    }

    fn read_inbox_entry(&self, account: &AccountId, index: u64) -> Result<MessageId, MessagingError> {
        let key = KeyPrefix::inbox_entry_key(account, index);
        let bytes = self
            .kv_store
            .get(&key)?
            .ok_or_else(|| StoreError::Corrupted {
                key: display_key(&key),
            })?;
        decode_u64(&bytes).map(MessageId::new).ok_or_else(|| {
            StoreError::Corrupted {
                key: display_key(&key),
            }
            .into()
        })
    }

    // =========================================================================
    // WRITE BODIES
    // =========================================================================

    fn register_inner(
        &mut self,
        ctx: &CallContext,
        username: &str,
        pubkey: &[u8],
    ) -> Result<(), MessagingError> {
        check_username(username, &self.config)?;
        check_pubkey(pubkey)?;

        let profile = Profile {
            owner: ctx.caller.clone(),
            username: username.to_string(),
            pubkey: Bytes::from_slice(pubkey),
            registered_at: ctx.height,
        };
        let encoded = self.serializer.encode(&profile)?;

        self.kv_store.atomic_batch_write(vec![
            BatchOperation::put(KeyPrefix::profile_key(&ctx.caller), encoded),
            BatchOperation::put(KeyPrefix::height_key(), ctx.height.to_be_bytes()),
        ])?;

        self.publisher.publish(&MessagingEvent::ProfileRegistered {
            owner: profile.owner,
            username: profile.username,
            height: ctx.height,
        });
        Ok(())
    }

    fn send_message_inner(
        &mut self,
        ctx: &CallContext,
        recipient: &AccountId,
        ciphertext: &[u8],
        media: Option<&[u8]>,
    ) -> Result<MessageId, MessagingError> {
        check_ciphertext(ciphertext, &self.config)?;
        check_media(media, &self.config)?;
        check_recipient(recipient, &self.config)?;
        check_self_message(&ctx.caller, recipient, self.config.self_message_policy)?;

        let last_id_key = KeyPrefix::last_message_id_key();
        let id = MessageId::new(self.read_u64(&last_id_key)?)
            .next()
            .ok_or_else(|| StoreError::CounterOverflow {
                key: display_key(&last_id_key),
            })?;

        let count_key = KeyPrefix::inbox_count_key(recipient);
        let inbox_index = self.read_u64(&count_key)?;
        let next_count = inbox_index
            .checked_add(1)
            .ok_or_else(|| StoreError::CounterOverflow {
                key: display_key(&count_key),
            })?;

        let message = Message {
            id,
            sender: ctx.caller.clone(),
            recipient: recipient.clone(),
            ciphertext: Bytes::from_slice(ciphertext),
            media: media.map(Bytes::from_slice),
            height: ctx.height,
        };
        let encoded = self.serializer.encode(&message)?;

        self.kv_store.atomic_batch_write(vec![
            BatchOperation::put(KeyPrefix::message_key(id), encoded),
            BatchOperation::put(
                KeyPrefix::inbox_entry_key(recipient, inbox_index),
                id.to_be_bytes(),
            ),
            BatchOperation::put(count_key, next_count.to_be_bytes()),
            BatchOperation::put(last_id_key, id.to_be_bytes()),
            BatchOperation::put(KeyPrefix::height_key(), ctx.height.to_be_bytes()),
        ])?;

        self.publisher.publish(&MessagingEvent::MessageSent {
            id,
            sender: message.sender,
            recipient: message.recipient,
            inbox_index,
            ciphertext_len: ciphertext.len(),
            has_media: media.is_some(),
            height: ctx.height,
        });
        Ok(id)
    }
}

impl<KV, RS, EP> MessagingApi for MessagingService<KV, RS, EP>
where
    KV: KeyValueStore,
    RS: RecordSerializer,
    EP: EventPublisher,
{
    #[instrument(skip(self, ctx, pubkey), fields(caller = %ctx.caller, height = ctx.height))]
    fn register(
        &mut self,
        ctx: &CallContext,
        username: &str,
        pubkey: &[u8],
    ) -> Result<(), MessagingError> {
        let result = self.register_inner(ctx, username, pubkey);
        self.stats.record_write(&result);

        match &result {
            Ok(()) => info!("[pma] Profile registered"),
            Err(e) => warn!(kind = %e.kind(), error = %e, "[pma] register rejected"),
        }
        result
    }

    #[instrument(
        skip(self, ctx, recipient, ciphertext, media),
        fields(
            caller = %ctx.caller,
            recipient = %recipient,
            height = ctx.height,
            ciphertext_len = ciphertext.len()
        )
    )]
    fn send_message(
        &mut self,
        ctx: &CallContext,
        recipient: &AccountId,
        ciphertext: &[u8],
        media: Option<&[u8]>,
    ) -> Result<MessageId, MessagingError> {
        let result = self.send_message_inner(ctx, recipient, ciphertext, media);
        self.stats.record_write(&result);

        match &result {
            Ok(id) => info!(id = id.value(), "[pma] Message stored"),
            Err(e) => warn!(kind = %e.kind(), error = %e, "[pma] send-message rejected"),
        }
        result
    }

    fn get_inbox_count(&self, account: &AccountId) -> Result<u64, MessagingError> {
        let result = self.read_u64(&KeyPrefix::inbox_count_key(account));
        self.stats.record_read(&result);
        result
    }

    fn get_inbox_message_id(
        &self,
        account: &AccountId,
        index: u64,
    ) -> Result<MessageId, MessagingError> {
        let result = (|| -> Result<MessageId, MessagingError> {
            let count = self.read_u64(&KeyPrefix::inbox_count_key(account))?;
            if index >= count {
                return Err(MessagingError::IndexOutOfRange { index, count });
            }
            self.read_inbox_entry(account, index)
        })();
        self.stats.record_read(&result);
        result
    }

    fn get_message(&self, ctx: &CallContext, id: MessageId) -> Result<Message, MessagingError> {
        let result = (|| -> Result<Message, MessagingError> {
            let message = self
                .load_message(id)?
                .ok_or(MessagingError::MessageNotFound(id))?;
            check_participant(&message, &ctx.caller)?;
            Ok(message)
        })();
        self.stats.record_read(&result);

        if let Err(MessagingError::NotParticipant { .. }) = &result {
            debug!(caller = %ctx.caller, id = id.value(), "[pma] get-message denied");
        }
        result
    }

    fn get_profile(&self, account: &AccountId) -> Result<Option<Profile>, MessagingError> {
        let result = (|| -> Result<Option<Profile>, MessagingError> {
            match self.kv_store.get(&KeyPrefix::profile_key(account))? {
                None => Ok(None),
                Some(bytes) => Ok(Some(self.serializer.decode(&bytes)?)),
            }
        })();
        self.stats.record_read(&result);
        result
    }

    fn get_last_message_id(&self) -> Result<u64, MessagingError> {
        let result = self.read_u64(&KeyPrefix::last_message_id_key());
        self.stats.record_read(&result);
        result
    }

    fn get_inbox_page(
        &self,
        account: &AccountId,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<MessageId>, MessagingError> {
        let result = (|| -> Result<Vec<MessageId>, MessagingError> {
            let count = self.read_u64(&KeyPrefix::inbox_count_key(account))?;
            let limit = limit.min(self.config.max_inbox_page);
            let end = offset.saturating_add(limit).min(count);
            (offset..end)
                .map(|index| self.read_inbox_entry(account, index))
                .collect()
        })();
        self.stats.record_read(&result);
        result
    }
}

/// Service over in-memory adapters.
pub type InMemoryMessagingService =
    MessagingService<InMemoryKVStore, BincodeRecordSerializer, NoopEventPublisher>;

/// Creates an in-memory service with default configuration.
pub fn create_test_service() -> InMemoryMessagingService {
    create_test_service_with_config(MessagingConfig::default())
}

/// Creates an in-memory service with the given configuration.
pub fn create_test_service_with_config(config: MessagingConfig) -> InMemoryMessagingService {
    MessagingService::new(
        MessagingDependencies {
            kv_store: InMemoryKVStore::new(),
            serializer: BincodeRecordSerializer,
            publisher: NoopEventPublisher,
        },
        config,
    )
}
