//! Compiled MIME documents.

use crate::charset::decode_text;
use crate::content_type::ContentType;
use crate::encoding::{decode_base64, decode_quoted_printable};
use crate::error::Result;
use crate::part::TransferEncoding;
use std::fmt;

/// One compiled body part: rendered headers, encoded payload, sub-parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WirePart {
    pub(crate) content_type: ContentType,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Option<Vec<u8>>,
    pub(crate) parts: Vec<Self>,
}

impl WirePart {
    /// Returns the effective content type, including generated parameters.
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Gets a rendered header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the rendered headers in emission order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the sub-parts.
    #[must_use]
    pub fn parts(&self) -> &[Self] {
        &self.parts
    }

    /// Checks whether this part is a multipart container.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.content_type.is_multipart()
    }

    /// Returns the transfer-encoded payload.
    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Returns the transfer encoding applied to the payload, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the rendered header names an unknown encoding.
    pub fn transfer_encoding(&self) -> Result<Option<TransferEncoding>> {
        self.header("Content-Transfer-Encoding")
            .map(TransferEncoding::parse)
            .transpose()
    }

    /// Reverses the transfer encoding of the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be decoded.
    pub fn decoded_body(&self) -> Result<Option<Vec<u8>>> {
        let Some(body) = &self.body else {
            return Ok(None);
        };
        let text = String::from_utf8_lossy(body);
        let decoded = match self.transfer_encoding()? {
            Some(TransferEncoding::Base64) => decode_base64(&text)?,
            Some(TransferEncoding::QuotedPrintable) => decode_quoted_printable(&text)?,
            _ => body.clone(),
        };
        Ok(Some(decoded))
    }

    /// Decodes the payload into text using the declared charset.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails or the charset is unknown.
    pub fn decoded_text(&self) -> Result<Option<String>> {
        let Some(bytes) = self.decoded_body()? else {
            return Ok(None);
        };
        let label = self.content_type.charset().unwrap_or("us-ascii");
        decode_text(&bytes, label).map(Some)
    }

    /// Appends the RFC 5322 rendering of this part to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        for (name, value) in &self.headers {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");

        if let Some(boundary) = self.content_type.boundary() {
            for part in &self.parts {
                out.extend_from_slice(b"--");
                out.extend_from_slice(boundary.as_bytes());
                out.extend_from_slice(b"\r\n");
                part.write_to(out);
                out.extend_from_slice(b"\r\n");
            }
            out.extend_from_slice(b"--");
            out.extend_from_slice(boundary.as_bytes());
            out.extend_from_slice(b"--\r\n");
        } else if !self.parts.is_empty() {
            // message/* containers embed their children directly
            for part in &self.parts {
                part.write_to(out);
            }
        } else if let Some(body) = &self.body {
            out.extend_from_slice(body);
        }
    }

    /// Renders this part to bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }
}

/// A fully compiled MIME document, ready for transmission or storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireDocument {
    root: WirePart,
}

impl WireDocument {
    pub(crate) const fn new(root: WirePart) -> Self {
        Self { root }
    }

    /// Returns the root part.
    #[must_use]
    pub const fn root(&self) -> &WirePart {
        &self.root
    }

    /// Gets a root header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.root.header(name)
    }

    /// Renders the document with CRLF line endings.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.root.to_bytes()
    }
}

/// Renders the document as text. Payloads sent as `8bit` in a non-UTF-8
/// charset are shown lossily; use [`WireDocument::to_bytes`] for delivery.
impl fmt::Display for WireDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}
