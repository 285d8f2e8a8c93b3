//! Error types for message construction and MIME compilation.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while validating, lowering or compiling a message.
///
/// All of these are local, pre-delivery failures. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The message is missing recipients, a body, or a sender.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// A header value contains a raw CR or LF character.
    #[error("Bad headers: {0}")]
    BadHeaders(String),

    /// No content type was given and none could be inferred.
    #[error("Content type unresolved: {0}")]
    ContentTypeUnresolved(String),

    /// An attachment has neither data nor a readable source.
    #[error("Missing data: {0}")]
    MissingData(String),

    /// A part with children has a non-multipart content type.
    #[error("Structural type error: {0}")]
    StructuralType(String),

    /// Transfer encoding or charset conversion cannot proceed safely.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A content type string could not be parsed.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Reading a lazy attachment source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
