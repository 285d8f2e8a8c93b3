//! # mailwright
//!
//! Sends email built with [`mailwright_mime`] through a pluggable transport.
//!
//! ## Features
//!
//! - **Validation before delivery**: invalid messages never reach a transport
//! - **Stamping**: default sender, `Date` and `Message-Id`, applied to a copy
//! - **Compile once**: each send compiles the message exactly once
//! - **Transports**: bring your own, or use the in-memory and directory ones
//! - **Configuration**: flat key/value settings or JSON
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwright::{Mailer, MailerConfig, MemoryTransport, Message};
//!
//! #[tokio::main]
//! async fn main() -> mailwright::Result<()> {
//!     let config = MailerConfig {
//!         default_sender: Some("noreply@example.com".to_string()),
//!         ..MailerConfig::default()
//!     };
//!     let mailer = Mailer::new(MemoryTransport::new(), config);
//!
//!     let message = Message::new("Welcome")
//!         .to("alice@example.com")
//!         .body("Hello!");
//!     mailer.send(&message).await?;
//!
//!     assert_eq!(mailer.transport().outbox().len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Writing a Transport
//!
//! ```ignore
//! use mailwright::{Envelope, Transport, WireDocument};
//!
//! struct Relay;
//!
//! impl Transport for Relay {
//!     async fn deliver(&self, envelope: &Envelope, document: &WireDocument) -> mailwright::Result<()> {
//!         // hand document.to_bytes() to envelope.recipients
//!         Ok(())
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
mod mailer;
pub mod transport;

pub use config::MailerConfig;
pub use error::{Error, Result};
pub use mailer::Mailer;
pub use transport::{Delivery, DirectoryTransport, MemoryTransport, Transport};

pub use mailwright_mime::{Attachment, Envelope, Message, WireDocument};

/// The underlying MIME construction crate.
pub use mailwright_mime as mime;
