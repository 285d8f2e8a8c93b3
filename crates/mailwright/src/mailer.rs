//! The mail sending front-end.

use crate::config::MailerConfig;
use crate::error::Result;
use crate::transport::Transport;
use chrono::Local;
use mailwright_mime::{Envelope, Message, WireDocument};
use tracing::{debug, warn};
use uuid::Uuid;

/// Validates, stamps and compiles messages, then hands them to a transport.
///
/// The caller's message is never modified: the default sender and the
/// generated `Date` and `Message-Id` headers are applied to a copy.
#[derive(Debug)]
pub struct Mailer<T> {
    transport: T,
    config: MailerConfig,
}

impl<T: Transport> Mailer<T> {
    /// Creates a mailer.
    #[must_use]
    pub const fn new(transport: T, config: MailerConfig) -> Self {
        Self { transport, config }
    }

    /// Returns the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &MailerConfig {
        &self.config
    }

    /// Prepares a message for delivery without sending it.
    ///
    /// Applies the default sender when the message has none, adds `Date`
    /// and `Message-Id` unless already present, validates, and compiles
    /// the message once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Message`](crate::Error::Message) if the message is
    /// invalid or cannot be compiled.
    pub fn prepare(&self, message: &Message) -> Result<(Envelope, WireDocument)> {
        let mut message = message.clone();

        if message.sender.as_deref().is_none_or(str::is_empty) {
            message.sender.clone_from(&self.config.default_sender);
        }
        if !message.extra_headers.contains("Date") {
            message
                .extra_headers
                .set("Date", Local::now().to_rfc2822());
        }
        if !message.extra_headers.contains("Message-Id") {
            message
                .extra_headers
                .set("Message-Id", self.message_id());
        }

        message.validate()?;
        message.materialize()?;
        let document = message.to_wire_document()?;
        let envelope = message.envelope()?;
        Ok((envelope, document))
    }

    /// Sends a message immediately.
    ///
    /// # Errors
    ///
    /// Returns message errors always, and transport errors unless
    /// `fail_silently` is configured.
    pub async fn send(&self, message: &Message) -> Result<()> {
        let (envelope, document) = self.prepare(message)?;
        let result = self.transport.deliver(&envelope, &document).await;
        self.finish(&envelope, result, "sent")
    }

    /// Queues a message for later delivery.
    ///
    /// # Errors
    ///
    /// Same as [`Mailer::send`].
    pub async fn send_to_queue(&self, message: &Message) -> Result<()> {
        let (envelope, document) = self.prepare(message)?;
        let result = self.transport.enqueue(&envelope, &document).await;
        self.finish(&envelope, result, "queued")
    }

    fn finish(&self, envelope: &Envelope, result: Result<()>, action: &str) -> Result<()> {
        match result {
            Ok(()) => {
                debug!(
                    sender = %envelope.sender,
                    recipients = envelope.recipients.len(),
                    "{action} message"
                );
                Ok(())
            }
            Err(e) if self.config.fail_silently && e.is_delivery_failure() => {
                warn!(error = %e, sender = %envelope.sender, "delivery failed, ignoring");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn message_id(&self) -> String {
        format!(
            "<{}@{}>",
            Uuid::new_v4().simple(),
            self.config.message_id_domain
        )
    }
}
