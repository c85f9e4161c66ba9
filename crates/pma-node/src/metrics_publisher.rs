//! Prometheus projection of ledger activity.

use pma_messaging::events::{MessagingEvent, Receipt};
use pma_messaging::ports::outbound::EventPublisher;
use pma_telemetry::{
    CIPHERTEXT_BYTES, LAST_MESSAGE_ID, LEDGER_HEIGHT, MESSAGES_SENT, OPERATIONS_REJECTED,
    PROFILES_REGISTERED, QUERIES_SERVED,
};

/// Publishes committed writes as counter updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsEventPublisher;

impl EventPublisher for MetricsEventPublisher {
    fn publish(&self, event: &MessagingEvent) {
        match event {
            MessagingEvent::ProfileRegistered { height, .. } => {
                PROFILES_REGISTERED.inc();
                LEDGER_HEIGHT.set(*height as f64);
            }
            MessagingEvent::MessageSent {
                id,
                ciphertext_len,
                height,
                ..
            } => {
                MESSAGES_SENT.inc();
                CIPHERTEXT_BYTES.inc_by(*ciphertext_len as f64);
                LAST_MESSAGE_ID.set(id.value() as f64);
                LEDGER_HEIGHT.set(*height as f64);
            }
        }
    }
}

/// Count a rejected transaction under its operation name and error kind.
pub fn record_transaction(operation: &str, receipt: &Receipt) {
    if let Some(kind) = receipt.error_kind() {
        OPERATIONS_REJECTED
            .with_label_values(&[operation, kind.code()])
            .inc();
    }
}

/// Count a query under its name and outcome.
pub fn record_query(query: &str, receipt: &Receipt) {
    let outcome = receipt.error_kind().map_or("ok", |kind| kind.code());
    QUERIES_SERVED.with_label_values(&[query, outcome]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pma_messaging::errors::ErrorKind;
    use pma_messaging::events::{ErrorPayload, OperationOutput};

    fn receipt(outcome: Result<OperationOutput, ErrorPayload>) -> Receipt {
        Receipt {
            sequence: Some(1),
            height: 1,
            caller: "alice".into(),
            outcome,
        }
    }

    #[test]
    fn test_message_event_updates_counters() {
        let before = CIPHERTEXT_BYTES.get();
        MetricsEventPublisher.publish(&MessagingEvent::MessageSent {
            id: pma_messaging::domain::MessageId::new(7),
            sender: "alice".into(),
            recipient: "bob".into(),
            inbox_index: 0,
            ciphertext_len: 100,
            has_media: false,
            height: 3,
        });
        assert!(CIPHERTEXT_BYTES.get() >= before + 100.0);
    }

    #[test]
    fn test_rejection_labels() {
        let rejected = receipt(Err(ErrorPayload {
            kind: ErrorKind::InvalidPubkeyLength,
            message: "invalid pubkey length".into(),
        }));
        record_transaction("register", &rejected);
        let counter = OPERATIONS_REJECTED.with_label_values(&["register", "invalid-pubkey-length"]);
        assert!(counter.get() >= 1.0);

        // Successful transactions are not counted as rejections.
        let ok = receipt(Ok(OperationOutput::Registered));
        let before = OPERATIONS_REJECTED
            .with_label_values(&["register", "invalid-pubkey-length"])
            .get();
        record_transaction("register", &ok);
        assert_eq!(counter.get(), before);
    }
}
