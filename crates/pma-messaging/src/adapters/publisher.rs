//! Event Publisher Adapters
//!
//! Implementations of the `EventPublisher` trait that stay inside the
//! process. Nodes that export metrics provide their own publisher.

use crate::events::MessagingEvent;
use crate::ports::outbound::EventPublisher;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventPublisher;

impl EventPublisher for NoopEventPublisher {
    fn publish(&self, _event: &MessagingEvent) {}
}

/// Writes every event to the tracing log at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

impl EventPublisher for TracingEventPublisher {
    fn publish(&self, event: &MessagingEvent) {
        match event {
            MessagingEvent::ProfileRegistered { owner, height, .. } => {
                debug!(owner = %owner, height, "[pma] event: profile-registered");
            }
            MessagingEvent::MessageSent {
                id,
                sender,
                recipient,
                inbox_index,
                ciphertext_len,
                ..
            } => {
                debug!(
                    id = id.value(),
                    sender = %sender,
                    recipient = %recipient,
                    inbox_index,
                    ciphertext_len,
                    "[pma] event: message-sent"
                );
            }
        }
    }
}

/// Keeps every event in memory, in publish order.
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<MessagingEvent>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events published so far.
    pub fn events(&self) -> Vec<MessagingEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of events published so far.
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing has been published.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventPublisher for RecordingEventPublisher {
    fn publish(&self, event: &MessagingEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

impl<P: EventPublisher + ?Sized> EventPublisher for std::sync::Arc<P> {
    fn publish(&self, event: &MessagingEvent) {
        (**self).publish(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_recording_keeps_order() {
        let publisher = Arc::new(RecordingEventPublisher::new());
        let shared = Arc::clone(&publisher);

        shared.publish(&MessagingEvent::ProfileRegistered {
            owner: "alice".into(),
            username: "alice".into(),
            height: 1,
        });
        shared.publish(&MessagingEvent::ProfileRegistered {
            owner: "bob".into(),
            username: "bob".into(),
            height: 2,
        });

        let events = publisher.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[1],
            MessagingEvent::ProfileRegistered { height: 2, .. }
        ));
    }
}
