//! Delivery transports.
//!
//! A [`Transport`] receives a compiled [`WireDocument`] together with its
//! [`Envelope`] and takes it somewhere: a server, a queue, a directory, or
//! memory. The [`Mailer`](crate::Mailer) does everything else.
//!
//! Two transports ship with the crate:
//!
//! - [`MemoryTransport`] records deliveries for inspection in tests
//! - [`DirectoryTransport`] writes each document to a `.msg` file

mod directory;
mod memory;

pub use directory::DirectoryTransport;
pub use memory::{Delivery, MemoryTransport};

use crate::error::Result;
use mailwright_mime::{Envelope, WireDocument};
use std::future::Future;

/// Hands compiled documents to a delivery mechanism.
///
/// Implementations must not modify the document; headers such as `Bcc`
/// are already absent from it and recipients come from the envelope.
pub trait Transport: Send + Sync {
    /// Delivers a document immediately.
    fn deliver(
        &self,
        envelope: &Envelope,
        document: &WireDocument,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Queues a document for later delivery.
    ///
    /// Transports without a queue deliver immediately.
    fn enqueue(
        &self,
        envelope: &Envelope,
        document: &WireDocument,
    ) -> impl Future<Output = Result<()>> + Send {
        self.deliver(envelope, document)
    }
}
