//! # mailwright-mime
//!
//! Builds RFC-compliant MIME documents from a structured description of an
//! outgoing email.
//!
//! ## Features
//!
//! - **Message model**: subject, sender, to/cc/bcc, plain text and HTML
//!   bodies, extra headers, attachments
//! - **Validation**: missing recipients, body or sender; header injection
//! - **Structure**: `multipart/mixed` around `multipart/alternative`, with
//!   no superfluous nesting
//! - **Charsets**: narrowest of `us-ascii`, `iso-8859-1`, `utf-8`
//! - **Encodings**: Base64, Quoted-Printable, 7bit, 8bit, RFC 2047 headers
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwright_mime::{Attachment, Message};
//!
//! let message = Message::new("Quarterly report")
//!     .from("Reports <reports@example.com>")
//!     .to("alice@example.com")
//!     .bcc("archive@example.com")
//!     .body("Plain text version")
//!     .html("<p>HTML version</p>")
//!     .attachment(Attachment::from_path("report.pdf")?);
//!
//! let document = message.to_wire_document()?;
//! let envelope = message.envelope()?;
//! transport.deliver(&envelope, &document).await?;
//! ```
//!
//! ## Building Trees Directly
//!
//! ```ignore
//! use mailwright_mime::{MailPart, compile};
//!
//! let mut root = MailPart::with_type("multipart/related");
//! root.attach(MailPart::leaf("text/html", "<img src=\"cid:logo\">"));
//! let document = compile(&root)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod attachment;
mod compiler;
mod content_type;
mod error;
mod header;
mod message;
mod part;
mod wire;

pub mod charset;
pub mod encoding;

pub use attachment::{Attachment, LazySource, Payload, guess_content_type};
pub use compiler::compile;
pub use content_type::{ContentType, ParamValue, Params};
pub use error::{Error, Result};
pub use header::{HeaderValue, Headers, is_address_header, normalize_name};
pub use message::{Content, Envelope, Message};
pub use part::{Body, MailPart, TransferEncoding};
pub use wire::{WireDocument, WirePart};
