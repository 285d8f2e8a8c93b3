//! Error types for mail delivery.

use thiserror::Error;

/// Errors that can occur while sending mail.
#[derive(Debug, Error)]
pub enum Error {
    /// The message could not be validated or compiled.
    #[error("Message error: {0}")]
    Message(#[from] mailwright_mime::Error),

    /// The transport failed to deliver the document.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if the failure happened while handing the document to
    /// the transport, as opposed to a problem with the message itself.
    #[must_use]
    pub const fn is_delivery_failure(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Io(_))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
