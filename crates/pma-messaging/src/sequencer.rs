//! # Sequencer
//!
//! Imposes the total order on the ledger. A single task owns the
//! [`MessagingService`] and drains one command channel, so transactions
//! apply strictly one after another and queries observe only committed
//! state.
//!
//! ## Blocks
//!
//! Transactions arrive in blocks. Each non-empty block runs at the next
//! ledger height and is sealed in the store, even when every transaction
//! in it was rejected. An empty block is a no-op and does not advance the
//! height. On spawn, the height resumes from the last sealed block.
//!
//! ```text
//! SequencerHandle ──(mpsc)──→ sequencer task ──→ MessagingService
//!        ↑                          │
//!        └──────(oneshot)───────────┘  Receipt / SequencerSummary
//! ```

use crate::domain::entities::CallContext;
use crate::domain::value_objects::AccountId;
use crate::errors::{MessagingError, SequencerError};
use crate::events::{ErrorPayload, Query, Receipt, Transaction};
use crate::ports::inbound::MessagingApi;
use crate::ports::outbound::{EventPublisher, KeyValueStore, RecordSerializer};
use crate::service::{MessagingService, ServiceStats};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Final state reported when the sequencer shuts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerSummary {
    /// Height of the last sealed block.
    pub height: u64,
    /// Highest allocated message id.
    pub last_message_id: u64,
    /// Service counters at shutdown.
    pub stats: ServiceStats,
}

enum Command {
    Block {
        transactions: Vec<Transaction>,
        reply: oneshot::Sender<Vec<Receipt>>,
    },
    Query {
        caller: AccountId,
        query: Query,
        reply: oneshot::Sender<Receipt>,
    },
    Shutdown {
        reply: oneshot::Sender<SequencerSummary>,
    },
}

/// Spawns the sequencer task.
pub struct Sequencer;

impl Sequencer {
    /// Moves `service` into a new task and returns a handle to it.
    ///
    /// Must be called from within a tokio runtime. `capacity` bounds the
    /// number of queued commands.
    ///
    /// # Errors
    ///
    /// Fails if the persisted ledger height cannot be read.
    pub fn spawn<KV, RS, EP>(
        service: MessagingService<KV, RS, EP>,
        capacity: usize,
    ) -> Result<SequencerHandle, MessagingError>
    where
        KV: KeyValueStore + 'static,
        RS: RecordSerializer + 'static,
        EP: EventPublisher + 'static,
    {
        let height = service.ledger_height()?;
        let (tx, rx) = mpsc::channel(capacity.max(1));

        info!(height, capacity, "[pma] Sequencer started");
        tokio::spawn(run(service, rx, height));

        Ok(SequencerHandle { tx })
    }
}

async fn run<KV, RS, EP>(
    mut service: MessagingService<KV, RS, EP>,
    mut rx: mpsc::Receiver<Command>,
    mut height: u64,
) where
    KV: KeyValueStore,
    RS: RecordSerializer,
    EP: EventPublisher,
{
    let mut sequence: u64 = 0;

    while let Some(command) = rx.recv().await {
        match command {
            Command::Block {
                transactions,
                reply,
            } => {
                if transactions.is_empty() {
                    let _ = reply.send(Vec::new());
                    continue;
                }

                height += 1;
                let mut receipts = Vec::with_capacity(transactions.len());
                for tx in transactions {
                    sequence += 1;
                    let ctx = CallContext::new(tx.caller, height);
                    let outcome = service
                        .apply(&ctx, &tx.operation)
                        .map_err(ErrorPayload::from);
                    receipts.push(Receipt {
                        sequence: Some(sequence),
                        height,
                        caller: ctx.caller,
                        outcome,
                    });
                }

                if let Err(e) = service.seal_height(height) {
                    warn!(height, error = %e, "[pma] Could not persist block height");
                }

                debug!(
                    height,
                    transactions = receipts.len(),
                    committed = receipts.iter().filter(|r| r.is_ok()).count(),
                    "[pma] Block sealed"
                );
                // The caller may have stopped waiting; the block is applied anyway.
                let _ = reply.send(receipts);
            }
            Command::Query {
                caller,
                query,
                reply,
            } => {
                let ctx = CallContext::new(caller, height);
                let outcome = service.query(&ctx, &query).map_err(ErrorPayload::from);
                let _ = reply.send(Receipt {
                    sequence: None,
                    height,
                    caller: ctx.caller,
                    outcome,
                });
            }
            Command::Shutdown { reply } => {
                rx.close();
                let last_message_id = service.get_last_message_id().unwrap_or_else(|e| {
                    warn!(error = %e, "[pma] Could not read last message id at shutdown");
                    0
                });
                let summary = SequencerSummary {
                    height,
                    last_message_id,
                    stats: service.stats(),
                };
                let _ = reply.send(summary);
                break;
            }
        }
    }

    info!(height, transactions = sequence, "[pma] Sequencer stopped");
}

/// Cloneable handle to a running sequencer.
#[derive(Clone, Debug)]
pub struct SequencerHandle {
    tx: mpsc::Sender<Command>,
}

impl SequencerHandle {
    /// Applies one transaction in a block of its own.
    pub async fn submit(&self, transaction: Transaction) -> Result<Receipt, SequencerError> {
        self.submit_block(vec![transaction])
            .await?
            .pop()
            .ok_or(SequencerError::ReplyDropped)
    }

    /// Applies `transactions` in order, all at the same new height.
    ///
    /// One receipt per transaction, in submission order. A rejected
    /// transaction does not affect the others in the block.
    pub async fn submit_block(
        &self,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<Receipt>, SequencerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Block {
            transactions,
            reply,
        })
        .await?;
        rx.await.map_err(|_| SequencerError::ReplyDropped)
    }

    /// Answers a read-only query against committed state.
    pub async fn query(
        &self,
        caller: impl Into<AccountId>,
        query: Query,
    ) -> Result<Receipt, SequencerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Query {
            caller: caller.into(),
            query,
            reply,
        })
        .await?;
        rx.await.map_err(|_| SequencerError::ReplyDropped)
    }

    /// Stops the sequencer after every command queued before this one.
    pub async fn shutdown(&self) -> Result<SequencerSummary, SequencerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown { reply }).await?;
        rx.await.map_err(|_| SequencerError::ReplyDropped)
    }

    /// Returns true once the sequencer task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, command: Command) -> Result<(), SequencerError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| SequencerError::Stopped)
    }
}
