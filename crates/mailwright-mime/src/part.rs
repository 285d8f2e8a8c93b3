//! The MIME part tree compiled into wire documents.

use crate::content_type::ParamValue;
use crate::error::{Error, Result};
use crate::header::{HeaderValue, Headers};
use std::fmt;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit passthrough.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    ///
    /// # Errors
    ///
    /// Returns an error for any name other than `base64`,
    /// `quoted-printable`, `7bit` or `8bit`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "7bit" => Ok(Self::SevenBit),
            "8bit" => Ok(Self::EightBit),
            "base64" => Ok(Self::Base64),
            "quoted-printable" => Ok(Self::QuotedPrintable),
            other => Err(Error::Encoding(format!(
                "Unknown transfer encoding: {other:?}"
            ))),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// Payload held by a part before transfer encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Text, converted to bytes with the part's charset at compile time.
    Text(String),
    /// Raw bytes.
    Binary(Vec<u8>),
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}

/// One node of a MIME tree.
///
/// Parts own their children; there are no back references. Consistency
/// between the content type and the presence of children is checked when
/// the tree is compiled, not when it is mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailPart {
    /// Headers other than the content headers.
    pub headers: Headers,
    /// Content type and its parameters.
    pub content_type: ParamValue,
    /// Content disposition and its parameters.
    pub content_disposition: ParamValue,
    /// Requested transfer encoding; the compiler picks one when unset.
    pub transfer_encoding: Option<String>,
    /// Payload of a leaf part.
    pub body: Option<Body>,
    /// Child parts, in order.
    pub children: Vec<Self>,
}

impl MailPart {
    /// Creates an empty part.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a part of the given content type with no parameters.
    #[must_use]
    pub fn with_type(content_type: &str) -> Self {
        Self {
            content_type: ParamValue::new(content_type),
            ..Self::default()
        }
    }

    /// Creates a leaf part holding a body.
    #[must_use]
    pub fn leaf(content_type: &str, body: impl Into<Body>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::with_type(content_type)
        }
    }

    /// Sets a header.
    pub fn set_header(&mut self, name: &str, value: impl Into<HeaderValue>) {
        self.headers.set(name, value);
    }

    /// Gets a header.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// Appends a child part.
    pub fn attach(&mut self, child: Self) {
        self.children.push(child);
    }

    /// Returns the declared MIME type, if any.
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.content_type.value.as_deref()
    }

    /// Iterates over all descendants, depth-first in pre-order.
    pub fn walk(&self) -> impl Iterator<Item = &Self> {
        let mut stack: Vec<&Self> = self.children.iter().rev().collect();
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }
}
