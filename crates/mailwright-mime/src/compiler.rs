//! Compiles a [`MailPart`] tree into a [`WireDocument`].
//!
//! The transform is pure: compiling the same tree twice yields identical
//! bytes. Multipart boundaries are derived from a digest of the compiled
//! children instead of a random source.

use crate::charset;
use crate::content_type::ContentType;
use crate::encoding::{encode_base64_body, encode_quoted_printable, fold_header};
use crate::error::{Error, Result};
use crate::part::{Body, MailPart, TransferEncoding};
use crate::wire::{WireDocument, WirePart};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use tracing::{debug, trace};

/// Headers generated by the compiler; same-named part headers are ignored.
const CONTENT_HEADERS: &[&str] = &[
    "Content-Type",
    "Content-Transfer-Encoding",
    "Content-Disposition",
    "Mime-Version",
];

const BOUNDARY_PREFIX: &str = "===============";

/// Compiles a part tree into a wire document.
///
/// # Errors
///
/// Returns [`Error::StructuralType`] when a part with children is not
/// multipart or message, [`Error::Encoding`] when a payload cannot be
/// encoded safely, and [`Error::InvalidContentType`] for malformed types.
pub fn compile(root: &MailPart) -> Result<WireDocument> {
    let compiled = compile_part(root, true)?;
    debug!(
        content_type = %compiled.content_type().mime_type(),
        parts = root.walk().count() + 1,
        "compiled MIME document"
    );
    Ok(WireDocument::new(compiled))
}

fn compile_part(part: &MailPart, is_root: bool) -> Result<WirePart> {
    let mut content_type = match ContentType::from_field(&part.content_type) {
        Some(parsed) => parsed?,
        None if part.children.is_empty() => ContentType::text_plain(),
        None => ContentType::multipart_mixed(),
    };

    if !part.children.is_empty() && !content_type.is_composite() {
        return Err(Error::StructuralType(format!(
            "Content type should be multipart or message, not {}",
            content_type.mime_type()
        )));
    }

    let children = part
        .children
        .iter()
        .map(|child| compile_part(child, false))
        .collect::<Result<Vec<_>>>()?;

    let mut encoding = None;
    let mut body = None;
    if content_type.is_multipart() {
        if content_type.boundary().is_none() {
            let boundary = boundary_for(&children);
            content_type.parameters.insert("boundary".to_string(), boundary);
        }
    } else if children.is_empty() {
        if let Some(payload) = &part.body {
            let bytes = payload_bytes(payload, &mut content_type)?;
            let transfer = resolve_encoding(part.transfer_encoding.as_deref(), &content_type)?;
            body = Some(apply_encoding(transfer, &bytes, content_type.is_text())?);
            encoding = Some(transfer);
        }
    }

    let mut headers = vec![content_header("Content-Type", &content_type)];
    if is_root {
        headers.push(("MIME-Version".to_string(), "1.0".to_string()));
    }

    for (name, value) in part.headers.sorted() {
        if CONTENT_HEADERS.contains(&name) {
            trace!(header = name, "ignoring header generated by the compiler");
            continue;
        }
        if value.is_empty() {
            continue;
        }
        headers.push((name.to_string(), value.render(name)));
    }

    if let Some(transfer) = encoding {
        headers.push(("Content-Transfer-Encoding".to_string(), transfer.to_string()));
    }
    if part.content_disposition.is_set() {
        headers.push(content_header("Content-Disposition", &part.content_disposition));
    }

    Ok(WirePart {
        content_type,
        headers,
        body,
        parts: children,
    })
}

fn content_header(name: &str, value: &impl std::fmt::Display) -> (String, String) {
    (name.to_string(), fold_header(&value.to_string(), name.len() + 2))
}

/// Converts a payload to bytes, resolving the charset of text parts.
fn payload_bytes(body: &Body, content_type: &mut ContentType) -> Result<Vec<u8>> {
    match body {
        Body::Text(text) => {
            if let Some(declared) = content_type.charset() {
                return charset::encode_text(text, declared);
            }
            if !content_type.is_text() {
                return Ok(text.as_bytes().to_vec());
            }
            let (selected, bytes) = charset::negotiate(text);
            trace!(charset = selected.name(), "selected charset for text part");
            content_type
                .parameters
                .insert("charset".to_string(), selected.name().to_string());
            Ok(bytes)
        }
        Body::Binary(bytes) => {
            if content_type.is_text() && content_type.charset().is_none() {
                // Undeclared raw bytes are never assumed to be UTF-8
                if !bytes.is_ascii() {
                    return Err(Error::Encoding(
                        "Text payload has non-ASCII bytes and no declared charset".to_string(),
                    ));
                }
                content_type
                    .parameters
                    .insert("charset".to_string(), charset::Charset::UsAscii.name().to_string());
            }
            Ok(bytes.clone())
        }
    }
}

fn resolve_encoding(requested: Option<&str>, content_type: &ContentType) -> Result<TransferEncoding> {
    match requested {
        Some(name) => TransferEncoding::parse(name),
        None if content_type.is_text() => Ok(TransferEncoding::QuotedPrintable),
        None => Ok(TransferEncoding::Base64),
    }
}

fn apply_encoding(encoding: TransferEncoding, bytes: &[u8], is_text: bool) -> Result<Vec<u8>> {
    match encoding {
        TransferEncoding::Base64 => Ok(encode_base64_body(bytes).into_bytes()),
        TransferEncoding::QuotedPrintable => Ok(encode_quoted_printable(bytes, is_text).into_bytes()),
        TransferEncoding::SevenBit => {
            if bytes.is_ascii() {
                Ok(bytes.to_vec())
            } else {
                Err(Error::Encoding(
                    "7bit transfer encoding cannot carry 8-bit data".to_string(),
                ))
            }
        }
        TransferEncoding::EightBit => Ok(bytes.to_vec()),
    }
}

/// Derives a boundary that does not occur in any of the children.
fn boundary_for(children: &[WirePart]) -> String {
    let rendered: Vec<Vec<u8>> = children.iter().map(WirePart::to_bytes).collect();
    let mut salt: u32 = 0;

    loop {
        let mut hasher = Sha256::new();
        hasher.update(salt.to_be_bytes());
        for child in &rendered {
            hasher.update(child);
        }
        let digest = hasher.finalize();

        let mut boundary = String::from(BOUNDARY_PREFIX);
        for byte in &digest[..12] {
            let _ = write!(boundary, "{byte:02x}");
        }
        boundary.push_str("==");

        let needle = boundary.as_bytes();
        let collides = rendered
            .iter()
            .any(|child| child.windows(needle.len()).any(|window| window == needle));
        if !collides {
            return boundary;
        }
        salt = salt.wrapping_add(1);
    }
}
