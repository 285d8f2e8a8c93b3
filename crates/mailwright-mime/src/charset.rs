//! Charset negotiation for text payloads.
//!
//! Text without a declared charset is written in the narrowest charset that
//! can represent it losslessly, tried in the fixed order `us-ascii`,
//! `iso-8859-1`, `utf-8`. Declared charsets may be any label known to the
//! WHATWG Encoding Standard (`windows-1252`, `koi8-r`, `shift_jis`, ...).

use crate::error::{Error, Result};
use encoding_rs::{Encoding, REPLACEMENT, UTF_16BE, UTF_16LE};
use std::fmt;

/// A charset the compiler negotiates for undeclared text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Charset {
    /// 7-bit ASCII.
    UsAscii,
    /// ISO-8859-1 (Latin-1).
    Iso8859_1,
    /// UTF-8.
    Utf8,
}

impl Charset {
    /// Negotiation preference order, narrowest first.
    pub const PREFERENCE: [Self; 3] = [Self::UsAscii, Self::Iso8859_1, Self::Utf8];

    /// Returns the canonical charset name used in `Content-Type` parameters.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UsAscii => "us-ascii",
            Self::Iso8859_1 => "iso-8859-1",
            Self::Utf8 => "utf-8",
        }
    }

    /// Matches the names this type writes itself.
    ///
    /// The WHATWG mapping treats `us-ascii` and `iso-8859-1` as
    /// `windows-1252`, which can represent characters these two cannot, so
    /// they are matched here before falling back to the registry.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::PREFERENCE
            .into_iter()
            .find(|charset| charset.name().eq_ignore_ascii_case(name))
    }

    /// Encodes text, returning `None` if a character cannot be represented.
    #[must_use]
    pub fn encode(self, text: &str) -> Option<Vec<u8>> {
        match self {
            Self::UsAscii => text.is_ascii().then(|| text.as_bytes().to_vec()),
            Self::Iso8859_1 => text
                .chars()
                .map(|ch| u8::try_from(u32::from(ch)).ok())
                .collect(),
            Self::Utf8 => Some(text.as_bytes().to_vec()),
        }
    }

    /// Decodes bytes written in this charset.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid in this charset.
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::UsAscii => {
                if bytes.is_ascii() {
                    Ok(String::from_utf8_lossy(bytes).into_owned())
                } else {
                    Err(Error::Encoding("Non-ASCII byte in us-ascii text".to_string()))
                }
            }
            Self::Iso8859_1 => Ok(bytes.iter().copied().map(char::from).collect()),
            Self::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|e| Error::Encoding(format!("Invalid UTF-8: {e}"))),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Selects the narrowest charset that can represent `text` losslessly.
///
/// Returns the charset together with the encoded bytes.
#[must_use]
pub fn negotiate(text: &str) -> (Charset, Vec<u8>) {
    for charset in Charset::PREFERENCE {
        if let Some(bytes) = charset.encode(text) {
            return (charset, bytes);
        }
    }
    // utf-8 always succeeds
    (Charset::Utf8, text.as_bytes().to_vec())
}

/// How a declared charset label is converted.
enum Codec {
    Negotiated(Charset),
    Registry(&'static Encoding),
}

fn resolve(label: &str) -> Result<Codec> {
    if let Some(charset) = Charset::parse(label) {
        return Ok(Codec::Negotiated(charset));
    }
    Encoding::for_label(label.trim().as_bytes())
        .filter(|encoding| *encoding != REPLACEMENT)
        .map(Codec::Registry)
        .ok_or_else(|| Error::Encoding(format!("Unknown charset: {label}")))
}

/// Encodes text in a declared charset.
///
/// # Errors
///
/// Returns an error if the charset label is unknown or a character cannot
/// be represented in it.
pub fn encode_text(text: &str, label: &str) -> Result<Vec<u8>> {
    let unmappable =
        || Error::Encoding(format!("Text cannot be represented in charset {label}"));

    match resolve(label)? {
        Codec::Negotiated(charset) => charset.encode(text).ok_or_else(unmappable),
        // encoding_rs only decodes UTF-16; its encoder would emit UTF-8
        Codec::Registry(encoding) if encoding == UTF_16BE => {
            Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect())
        }
        Codec::Registry(encoding) if encoding == UTF_16LE => {
            Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect())
        }
        Codec::Registry(encoding) => {
            let (bytes, _, had_errors) = encoding.encode(text);
            if had_errors {
                Err(unmappable())
            } else {
                Ok(bytes.into_owned())
            }
        }
    }
}

/// Decodes bytes written in a declared charset.
///
/// # Errors
///
/// Returns an error if the charset label is unknown or the bytes are
/// malformed for it.
pub fn decode_text(bytes: &[u8], label: &str) -> Result<String> {
    match resolve(label)? {
        Codec::Negotiated(charset) => charset.decode(bytes),
        Codec::Registry(encoding) => encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(std::borrow::Cow::into_owned)
            .ok_or_else(|| Error::Encoding(format!("Malformed {label} text"))),
    }
}
