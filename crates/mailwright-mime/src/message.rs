//! The user-facing email message model.

use crate::attachment::{Attachment, Payload};
use crate::compiler::compile;
use crate::error::{Error, Result};
use crate::header::{HeaderValue, Headers};
use crate::part::MailPart;
use crate::wire::WireDocument;
use std::collections::BTreeSet;

/// A message body: raw text, or an attachment carrying a custom content
/// type or transfer encoding.
#[derive(Debug, Clone)]
pub enum Content {
    /// Plain text, sent inline with a negotiated charset.
    Text(String),
    /// A body described by an attachment.
    Attachment(Attachment),
}

impl Content {
    /// True for empty text. An attachment body is never empty here, even
    /// when its payload has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }

    /// Lowers the body into a MIME part with the given default type.
    fn to_mail_part(&self, default_content_type: &str) -> Result<MailPart> {
        match self {
            Self::Text(text) => {
                let implicit = Attachment {
                    disposition: "inline".to_string(),
                    transfer_encoding: None,
                    ..Attachment::from_data(Payload::Text(text.clone()))
                };
                implicit.to_mail_part(Some(default_content_type))
            }
            Self::Attachment(attachment) => attachment.to_mail_part(Some(default_content_type)),
        }
    }

    fn materialize(&self) -> Result<()> {
        match self {
            Self::Text(_) => Ok(()),
            Self::Attachment(attachment) => attachment.materialize(),
        }
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Attachment> for Content {
    fn from(value: Attachment) -> Self {
        Self::Attachment(value)
    }
}

/// Envelope information a transport needs alongside the document.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Envelope {
    /// Envelope sender.
    pub sender: String,
    /// Every recipient: to, cc and bcc, sorted and de-duplicated.
    pub recipients: BTreeSet<String>,
}

/// An email message.
///
/// Compiling a message never mutates it, so the same message can be turned
/// into a [`WireDocument`] once per delivery attempt.
#[derive(Debug, Clone, Default)]
pub struct Message {
    /// Subject line.
    pub subject: String,
    /// Sender address, raw or `Name <addr>`.
    pub sender: Option<String>,
    /// Plain-text body.
    pub body: Option<Content>,
    /// HTML body.
    pub html: Option<Content>,
    /// `To` recipients.
    pub recipients: Vec<String>,
    /// `Cc` recipients.
    pub cc: Vec<String>,
    /// `Bcc` recipients; they receive the message but never appear in headers.
    pub bcc: Vec<String>,
    /// Additional headers, applied last.
    pub extra_headers: Headers,
    /// File attachments, in order.
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Creates a message with a subject.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    /// Sets the sender.
    #[must_use]
    pub fn from(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Adds a `To` recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.add_recipient(recipient);
        self
    }

    /// Adds a `Cc` recipient.
    #[must_use]
    pub fn cc(mut self, recipient: impl Into<String>) -> Self {
        self.add_cc(recipient);
        self
    }

    /// Adds a `Bcc` recipient.
    #[must_use]
    pub fn bcc(mut self, recipient: impl Into<String>) -> Self {
        self.add_bcc(recipient);
        self
    }

    /// Sets the plain-text body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Content>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html(mut self, html: impl Into<Content>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Sets an extra header.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.extra_headers.set(name, value.into());
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attach(attachment);
        self
    }

    /// Adds a `To` recipient.
    pub fn add_recipient(&mut self, recipient: impl Into<String>) {
        self.recipients.push(recipient.into());
    }

    /// Adds a `Cc` recipient.
    pub fn add_cc(&mut self, recipient: impl Into<String>) {
        self.cc.push(recipient.into());
    }

    /// Adds a `Bcc` recipient.
    pub fn add_bcc(&mut self, recipient: impl Into<String>) {
        self.bcc.push(recipient.into());
    }

    /// Adds an attachment.
    pub fn attach(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Builds and adds an attachment from its parts.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`Attachment::new`].
    pub fn attach_data(
        &mut self,
        filename: Option<String>,
        content_type: Option<String>,
        data: Option<Payload>,
        disposition: Option<String>,
    ) -> Result<()> {
        let mut attachment = Attachment::new(filename, content_type, data)?;
        if let Some(disposition) = disposition {
            attachment.disposition = disposition;
        }
        self.attach(attachment);
        Ok(())
    }

    /// Returns every envelope recipient: to, cc and bcc.
    #[must_use]
    pub fn send_to(&self) -> BTreeSet<String> {
        self.recipients
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .cloned()
            .collect()
    }

    /// Returns the envelope for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMessage`] if no sender is set.
    pub fn envelope(&self) -> Result<Envelope> {
        let sender = self
            .sender
            .clone()
            .ok_or_else(|| Error::InvalidMessage("No sender address has been set".to_string()))?;
        Ok(Envelope {
            sender,
            recipients: self.send_to(),
        })
    }

    /// Checks for CR or LF in the subject, sender, any recipient, or any
    /// extra header value.
    #[must_use]
    pub fn has_bad_headers(&self) -> bool {
        let has_newline = |value: &str| value.contains(['\r', '\n']);

        has_newline(&self.subject)
            || self.sender.as_deref().is_some_and(has_newline)
            || self.send_to().iter().any(|addr| has_newline(addr))
            || self
                .extra_headers
                .iter()
                .flat_map(|(_, value)| value.values())
                .any(has_newline)
    }

    fn bodies(&self) -> impl Iterator<Item = &Content> {
        [&self.body, &self.html].into_iter().flatten()
    }

    /// Validates the message before compilation or delivery.
    ///
    /// Checks run in order: recipients, body, sender, then headers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMessage`] for a missing recipient, body or
    /// sender, and [`Error::BadHeaders`] for header injection attempts.
    pub fn validate(&self) -> Result<()> {
        if self.recipients.is_empty() && self.cc.is_empty() && self.bcc.is_empty() {
            return Err(Error::InvalidMessage(
                "No recipients have been added".to_string(),
            ));
        }

        if !self.bodies().any(|content| !content.is_empty()) {
            return Err(Error::InvalidMessage("No body has been set".to_string()));
        }

        if self.sender.as_deref().is_none_or(str::is_empty) {
            return Err(Error::InvalidMessage(
                "No sender address has been set".to_string(),
            ));
        }

        if self.has_bad_headers() {
            return Err(Error::BadHeaders(
                "Header values may not contain CR or LF".to_string(),
            ));
        }

        Ok(())
    }

    /// Reads every lazy attachment source now.
    ///
    /// # Errors
    ///
    /// Returns an error if any source cannot be read.
    pub fn materialize(&self) -> Result<()> {
        for content in self.bodies() {
            content.materialize()?;
        }
        for attachment in &self.attachments {
            attachment.materialize()?;
        }
        Ok(())
    }

    /// Lowers the message into its root MIME part.
    ///
    /// With attachments the root is `multipart/mixed`, holding the body part
    /// first and then one part per attachment. The body part is
    /// `multipart/alternative` with plain text first and HTML second when
    /// both are set, or the single body otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no body or an attachment cannot be
    /// lowered.
    pub fn to_mail_part(&self) -> Result<MailPart> {
        let text = self
            .body
            .as_ref()
            .filter(|body| !body.is_empty())
            .map(|body| body.to_mail_part("text/plain"))
            .transpose()?;
        let html = self
            .html
            .as_ref()
            .filter(|html| !html.is_empty())
            .map(|html| html.to_mail_part("text/html"))
            .transpose()?;

        let alternative = match (text, html) {
            (Some(text), Some(html)) => {
                let mut part = MailPart::with_type("multipart/alternative");
                part.attach(text);
                part.attach(html);
                part
            }
            (Some(single), None) | (None, Some(single)) => single,
            (None, None) => {
                return Err(Error::InvalidMessage("No body has been set".to_string()));
            }
        };

        let mut root = if self.attachments.is_empty() {
            alternative
        } else {
            let mut mixed = MailPart::with_type("multipart/mixed");
            mixed.attach(alternative);
            for attachment in &self.attachments {
                mixed.attach(attachment.to_mail_part(None)?);
            }
            mixed
        };

        root.set_header("To", HeaderValue::AddressList(self.recipients.clone()));
        root.set_header("From", self.sender.clone().unwrap_or_default());
        root.set_header("Subject", self.subject.clone());
        if !self.cc.is_empty() {
            root.set_header("Cc", HeaderValue::AddressList(self.cc.clone()));
        }
        root.headers.merge(&self.extra_headers);

        Ok(root)
    }

    /// Validates and compiles the message into a wire document.
    ///
    /// # Errors
    ///
    /// Returns any validation, lowering or compilation error.
    pub fn to_wire_document(&self) -> Result<WireDocument> {
        self.validate()?;
        compile(&self.to_mail_part()?)
    }
}
