//! Transfer and header encodings.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 header encoding.

use crate::charset::decode_text;
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Maximum line length for encoded bodies (RFC 2045).
const MAX_LINE_LENGTH: usize = 76;

/// Preferred length of a header line (RFC 5322 section 2.1.1).
pub const HEADER_LINE_LENGTH: usize = 78;

/// Hard limit on a header line, excluding CRLF.
pub const MAX_HEADER_LINE_LENGTH: usize = 998;

/// Largest UTF-8 chunk placed in a single encoded word.
///
/// 45 bytes become 60 Base64 characters, which keeps each encoded word
/// under the 75 character limit of RFC 2047 together with its delimiters.
const MAX_WORD_BYTES: usize = 45;

/// Encodes data as Base64 without line breaks.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as a Base64 body, wrapped at 76 characters with CRLF.
#[must_use]
pub fn encode_base64_body(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);

    // Base64 output is pure ASCII, so byte chunks are valid str boundaries.
    for line in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        result.push_str(&String::from_utf8_lossy(line));
        result.push_str("\r\n");
    }

    result
}

/// Decodes Base64 data, ignoring embedded whitespace and line breaks.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Encodes bytes using Quoted-Printable encoding (RFC 2045).
///
/// With `line_breaks` set, LF and CRLF in the input are kept as hard line
/// breaks (emitted as CRLF); otherwise they are escaped like any other
/// control byte. Space characters are always written as `=20` so that a
/// space in front of a line break can never be stripped in transit.
#[must_use]
pub fn encode_quoted_printable(data: &[u8], line_breaks: bool) -> String {
    let mut result = String::with_capacity(data.len());
    let mut line_length = 0;
    let mut index = 0;

    while index < data.len() {
        let byte = data[index];

        if line_breaks {
            if byte == b'\n' {
                result.push_str("\r\n");
                line_length = 0;
                index += 1;
                continue;
            }
            if byte == b'\r' && data.get(index + 1) == Some(&b'\n') {
                result.push_str("\r\n");
                line_length = 0;
                index += 2;
                continue;
            }
        }

        let literal = matches!(byte, b'!'..=b'<' | b'>'..=b'~');
        let width = if literal { 1 } else { 3 };

        // Leave room for the trailing '=' of a soft line break
        if line_length + width > MAX_LINE_LENGTH - 1 {
            result.push_str("=\r\n");
            line_length = 0;
        }

        if literal {
            result.push(char::from(byte));
        } else {
            let _ = write!(result, "={byte:02X}");
        }
        line_length += width;
        index += 1;
    }

    result
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        let byte = bytes[index];
        if byte != b'=' {
            result.push(byte);
            index += 1;
            continue;
        }

        // Soft line break
        match (bytes.get(index + 1), bytes.get(index + 2)) {
            (Some(b'\r'), Some(b'\n')) => {
                index += 3;
                continue;
            }
            (Some(b'\n'), _) => {
                index += 2;
                continue;
            }
            _ => {}
        }

        let hex = bytes
            .get(index + 1..index + 3)
            .ok_or_else(|| Error::Encoding("Incomplete escape sequence".to_string()))?;
        let hex = std::str::from_utf8(hex)
            .map_err(|_| Error::Encoding("Invalid escape sequence".to_string()))?;
        let decoded = u8::from_str_radix(hex, 16)
            .map_err(|e| Error::Encoding(format!("Invalid hex: {e}")))?;
        result.push(decoded);
        index += 3;
    }

    Ok(result)
}

/// Returns true if a header value must be written as encoded words.
#[must_use]
pub fn needs_rfc2047(text: &str) -> bool {
    !text.is_ascii() || text.contains("=?")
}

/// Encodes a header value using RFC 2047 encoding.
///
/// Format: `=?charset?B?encoded-text?=`. Values that need no encoding are
/// returned unchanged. Long values are split on character boundaries into
/// several encoded words joined by folding whitespace.
#[must_use]
pub fn encode_rfc2047(text: &str) -> String {
    if needs_rfc2047(text) {
        force_rfc2047(text)
    } else {
        text.to_string()
    }
}

/// Encodes a header value as RFC 2047 encoded words even if it is ASCII.
#[must_use]
pub fn force_rfc2047(text: &str) -> String {
    let mut words = Vec::new();
    let mut chunk = String::new();
    for ch in text.chars() {
        if chunk.len() + ch.len_utf8() > MAX_WORD_BYTES {
            words.push(format!("=?utf-8?B?{}?=", encode_base64(chunk.as_bytes())));
            chunk.clear();
        }
        chunk.push(ch);
    }
    if !chunk.is_empty() {
        words.push(format!("=?utf-8?B?{}?=", encode_base64(chunk.as_bytes())));
    }

    words.join("\r\n ")
}

/// Folds a header value so its lines stay near [`HEADER_LINE_LENGTH`].
///
/// `offset` is the width already taken on the first line, usually the
/// header name plus `": "`. Folds are inserted only before existing spaces,
/// so unfolding (removing each CRLF) restores the value exactly. Existing
/// folds are kept, and a single token longer than a line is left whole.
#[must_use]
pub fn fold_header(value: &str, offset: usize) -> String {
    let mut result = String::with_capacity(value.len() + value.len() / HEADER_LINE_LENGTH * 3);
    let mut line_length = offset;

    for (index, line) in value.split("\r\n").enumerate() {
        if index > 0 {
            result.push_str("\r\n");
            line_length = 0;
        }
        let mut has_text = false;
        for (position, word) in line.split(' ').enumerate() {
            if position > 0 {
                if has_text && !word.is_empty() && line_length + 1 + word.len() > HEADER_LINE_LENGTH {
                    result.push_str("\r\n");
                    line_length = 0;
                    has_text = false;
                }
                result.push(' ');
                line_length += 1;
            }
            result.push_str(word);
            line_length += word.len();
            has_text |= !word.is_empty();
        }
    }

    result
}

/// Checks whether a value has a token too long for any folded line.
#[must_use]
pub fn has_overlong_word(value: &str, offset: usize) -> bool {
    value
        .split_whitespace()
        .any(|word| offset + word.len() > MAX_HEADER_LINE_LENGTH)
}

/// Decodes an RFC 2047 encoded header value.
///
/// Adjacent encoded words are concatenated without the whitespace that
/// separates them; plain tokens are kept as they are.
///
/// # Errors
///
/// Returns an error if an encoded word is malformed or uses an unknown
/// charset or encoding.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    let mut result = String::new();
    let mut previous_encoded = false;

    for (position, token) in text.split_whitespace().enumerate() {
        let encoded = token.starts_with("=?") && token.ends_with("?=") && token.len() > 4;
        if position > 0 && !(encoded && previous_encoded) {
            result.push(' ');
        }

        if encoded {
            result.push_str(&decode_word(&token[2..token.len() - 2])?);
        } else {
            result.push_str(token);
        }
        previous_encoded = encoded;
    }

    Ok(result)
}

fn decode_word(inner: &str) -> Result<String> {
    let parts: Vec<&str> = inner.split('?').collect();
    if parts.len() != 3 {
        return Err(Error::Encoding("Invalid RFC 2047 format".to_string()));
    }

    let bytes = match parts[1].to_uppercase().as_str() {
        "B" => decode_base64(parts[2])?,
        // Q encoding uses underscore for space
        "Q" => decode_quoted_printable(&parts[2].replace('_', " "))?,
        other => {
            return Err(Error::Encoding(format!("Unknown encoding: {other}")));
        }
    };

    decode_text(&bytes, parts[0])
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_base64_body_wraps_lines() {
        let data = vec![0u8; 200];
        let encoded = encode_base64_body(&data);
        for line in encoded.split("\r\n").filter(|l| !l.is_empty()) {
            assert!(line.len() <= 76);
        }
        assert!(encoded.ends_with("\r\n"));
        assert_eq!(decode_base64(&encoded).unwrap(), data);
    }

    #[test]
    fn test_quoted_printable_encode() {
        let encoded = encode_quoted_printable(b"Hello,World!", true);
        assert_eq!(encoded, "Hello,World!");

        let encoded = encode_quoted_printable("Héllo".as_bytes(), true);
        assert_eq!(encoded, "H=C3=A9llo");
    }

    #[test]
    fn test_quoted_printable_escapes_spaces() {
        let encoded = encode_quoted_printable(b"trailing \nnext line", true);
        assert_eq!(encoded, "trailing=20\r\nnext=20line");
        assert!(!encoded.contains(" \r\n"));
    }

    #[test]
    fn test_quoted_printable_binary_mode_escapes_newlines() {
        let encoded = encode_quoted_printable(b"a\r\nb", false);
        assert_eq!(encoded, "a=0D=0Ab");
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        let encoded = encode_quoted_printable(&[b'x'; 100], true);
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 76);
        assert!(lines[0].ends_with('='));

        let decoded = decode_quoted_printable("Hello=\r\nWorld").unwrap();
        assert_eq!(decoded, b"HelloWorld");
    }

    #[test]
    fn test_quoted_printable_decode() {
        let decoded = decode_quoted_printable("H=C3=A9llo").unwrap();
        assert_eq!(decoded, "Héllo".as_bytes());

        assert!(decode_quoted_printable("broken=4").is_err());
        assert!(decode_quoted_printable("broken=ZZ").is_err());
    }

    #[test]
    fn test_rfc2047_encode() {
        assert_eq!(encode_rfc2047("Hello?"), "Hello?");

        let encoded = encode_rfc2047("Héllo");
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(encoded.ends_with("?="));
    }

    #[test]
    fn test_rfc2047_long_value_is_split() {
        let text = "ñ".repeat(60);
        let encoded = encode_rfc2047(&text);
        for word in encoded.split("\r\n ") {
            assert!(word.len() <= 75, "word too long: {word}");
        }
        assert_eq!(decode_rfc2047(&encoded).unwrap(), text);
    }

    #[test]
    fn test_fold_header_short_value_untouched() {
        assert_eq!(fold_header("Hello world", 9), "Hello world");
    }

    #[test]
    fn test_fold_header_breaks_before_spaces() {
        let value = "word ".repeat(40);
        let folded = fold_header(value.trim_end(), 9);
        let lines: Vec<&str> = folded.split("\r\n").collect();
        assert!(lines.len() > 1);
        assert!(lines[0].len() + 9 <= HEADER_LINE_LENGTH);
        for line in &lines[1..] {
            assert!(line.starts_with(' '));
            assert!(line.len() <= HEADER_LINE_LENGTH);
        }
        assert_eq!(folded.replace("\r\n", ""), value.trim_end());
    }

    #[test]
    fn test_fold_header_keeps_existing_folds_and_long_words() {
        let encoded = encode_rfc2047(&"ñ".repeat(60));
        assert_eq!(fold_header(&encoded, 9), encoded);

        let long = "x".repeat(120);
        assert_eq!(fold_header(&long, 9), long);
        assert!(!has_overlong_word(&long, 9));
        assert!(has_overlong_word(&"x".repeat(1200), 9));
    }

    #[test]
    fn test_rfc2047_decode() {
        assert_eq!(decode_rfc2047("Hello").unwrap(), "Hello");
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?=").unwrap(), "Héllo");
        assert_eq!(decode_rfc2047("=?utf-8?Q?H=C3=A9llo?=").unwrap(), "Héllo");
        assert_eq!(decode_rfc2047("=?windows-1252?Q?caf=E9?=").unwrap(), "café");
        assert_eq!(decode_rfc2047("=?iso-8859-1?Q?Se=F1or?=").unwrap(), "Señor");
        assert!(decode_rfc2047("=?utf-8?X?abc?=").is_err());
    }

    proptest! {
        #[test]
        fn folding_is_reversible(words in proptest::collection::vec("[a-zA-Z0-9,<>@.]{1,30}", 0..60), offset in 0usize..40) {
            let value = words.join(" ");
            let folded = fold_header(&value, offset);
            prop_assert_eq!(folded.replace("\r\n", ""), value);
            for (index, line) in folded.split("\r\n").enumerate() {
                let width = if index == 0 { offset + line.len() } else { line.len() };
                prop_assert!(width <= HEADER_LINE_LENGTH || !line.trim().contains(' '));
                prop_assert!(index == 0 || !line.trim().is_empty());
            }
        }

        #[test]
        fn base64_body_round_trips(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let encoded = encode_base64_body(&data);
            prop_assert_eq!(decode_base64(&encoded).unwrap(), data);
        }

        #[test]
        fn quoted_printable_round_trips_binary(data in proptest::collection::vec(any::<u8>(), 0..1024)) {
            let encoded = encode_quoted_printable(&data, false);
            prop_assert!(encoded.is_ascii());
            prop_assert!(!encoded.contains(' '));
            prop_assert_eq!(decode_quoted_printable(&encoded).unwrap(), data);
        }

        #[test]
        fn quoted_printable_lines_stay_short(text in "[ -~\n]{0,400}") {
            let encoded = encode_quoted_printable(text.as_bytes(), true);
            for line in encoded.split("\r\n") {
                prop_assert!(line.len() <= 76);
                prop_assert!(!line.ends_with(' '));
            }
        }
    }
}
