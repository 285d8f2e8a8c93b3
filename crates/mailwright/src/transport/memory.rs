//! In-memory transport for tests.

use super::Transport;
use crate::error::{Error, Result};
use mailwright_mime::{Envelope, WireDocument};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// A document handed to a [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Envelope the document was sent with.
    pub envelope: Envelope,
    /// The compiled document.
    pub document: WireDocument,
}

/// Records every delivery instead of sending it.
///
/// Immediate deliveries go to the outbox, queued ones to the queue.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    outbox: Mutex<Vec<Delivery>>,
    queue: Mutex<Vec<Delivery>>,
}

impl MemoryTransport {
    /// Creates an empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of immediate deliveries, oldest first.
    #[must_use]
    pub fn outbox(&self) -> Vec<Delivery> {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns a snapshot of queued deliveries, oldest first.
    #[must_use]
    pub fn queue(&self) -> Vec<Delivery> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Empties the outbox and the queue.
    pub fn clear(&self) {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(list: &Mutex<Vec<Delivery>>, envelope: &Envelope, document: &WireDocument) -> Result<()> {
        let mut list = list
            .lock()
            .map_err(|_| Error::Transport("Delivery log lock poisoned".to_string()))?;
        list.push(Delivery {
            envelope: envelope.clone(),
            document: document.clone(),
        });
        Ok(())
    }
}

impl Transport for MemoryTransport {
    async fn deliver(&self, envelope: &Envelope, document: &WireDocument) -> Result<()> {
        Self::record(&self.outbox, envelope, document)?;
        debug!(recipients = envelope.recipients.len(), "recorded delivery in outbox");
        Ok(())
    }

    async fn enqueue(&self, envelope: &Envelope, document: &WireDocument) -> Result<()> {
        Self::record(&self.queue, envelope, document)?;
        debug!(recipients = envelope.recipients.len(), "recorded delivery in queue");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mailwright_mime::Message;

    fn document() -> (Envelope, WireDocument) {
        let message = Message::new("hi")
            .from("a@example.com")
            .to("b@example.com")
            .body("x");
        (message.envelope().unwrap(), message.to_wire_document().unwrap())
    }

    #[tokio::test]
    async fn test_deliver_and_enqueue_are_separate() {
        let transport = MemoryTransport::new();
        let (envelope, document) = document();

        transport.deliver(&envelope, &document).await.unwrap();
        transport.enqueue(&envelope, &document).await.unwrap();
        transport.enqueue(&envelope, &document).await.unwrap();

        assert_eq!(transport.outbox().len(), 1);
        assert_eq!(transport.queue().len(), 2);
        assert_eq!(transport.outbox()[0].envelope, envelope);
        assert_eq!(transport.outbox()[0].document, document);
    }

    #[tokio::test]
    async fn test_clear() {
        let transport = MemoryTransport::new();
        let (envelope, document) = document();
        transport.deliver(&envelope, &document).await.unwrap();
        transport.clear();
        assert!(transport.outbox().is_empty());
        assert!(transport.queue().is_empty());
    }
}
