//! MIME content type and parameter handling.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

/// Header parameters, keyed by lower-cased name.
///
/// Kept sorted so that rendering is deterministic.
pub type Params = BTreeMap<String, String>;

/// A header value paired with its parameters, such as a content type or a
/// content disposition. An unset value renders nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamValue {
    /// The value before the first `;`, lower-cased.
    pub value: Option<String>,
    /// The parameters after it.
    pub params: Params,
}

impl ParamValue {
    /// Creates a value with no parameters.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into().to_lowercase()),
            params: Params::new(),
        }
    }

    /// Parses `value; key=value; key="quoted value"`.
    ///
    /// Parameter names are case-insensitive; values may be quoted.
    ///
    /// # Errors
    ///
    /// Returns an error if the leading value is empty.
    pub fn parse(s: &str) -> Result<Self> {
        let mut segments = split_params(s).into_iter();
        let value = segments
            .next()
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::InvalidContentType(format!("Empty header value: {s:?}")))?;

        let mut params = Params::new();
        for segment in segments {
            if let Some((key, raw)) = segment.split_once('=') {
                let key = key.trim().to_lowercase();
                if key.is_empty() {
                    continue;
                }
                params.insert(key, unquote(raw.trim()));
            }
        }

        Ok(Self {
            value: Some(value),
            params,
        })
    }

    /// Sets a parameter, replacing any previous value.
    pub fn set_param(&mut self, key: &str, value: impl Into<String>) {
        self.params.insert(key.to_lowercase(), value.into());
    }

    /// Returns a parameter value.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Checks whether a value has been set.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(value) = &self.value {
            f.write_str(value)?;
            write_params(f, &self.params)?;
        }
        Ok(())
    }
}

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8, boundary=xxx).
    pub parameters: Params,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into().to_lowercase(),
            sub_type: sub_type.into().to_lowercase(),
            parameters: Params::new(),
        }
    }

    /// Creates a text/plain content type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// Creates a multipart/mixed content type.
    #[must_use]
    pub fn multipart_mixed() -> Self {
        Self::new("multipart", "mixed")
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: &str, value: impl Into<String>) -> Self {
        self.parameters.insert(key.to_lowercase(), value.into());
        self
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary").map(String::as_str)
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// Checks if this type may carry child parts (multipart or message).
    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.is_multipart() || self.main_type == "message"
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type == "text"
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`
    ///
    /// # Errors
    ///
    /// Returns an error if the type or subtype is missing.
    pub fn parse(s: &str) -> Result<Self> {
        let field = ParamValue::parse(s)?;
        Self::from_field(&field)
            .ok_or_else(|| Error::InvalidContentType(format!("Missing content type in {s:?}")))?
    }

    /// Builds a content type from a parsed header value.
    ///
    /// Returns `None` if the value is unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not of the form `type/subtype`.
    pub fn from_field(field: &ParamValue) -> Option<Result<Self>> {
        let value = field.value.as_deref()?;
        let parsed = value
            .split_once('/')
            .map(|(main, sub)| (main.trim(), sub.trim()))
            .filter(|(main, sub)| !main.is_empty() && !sub.is_empty() && !sub.contains('/'))
            .map(|(main, sub)| {
                let mut content_type = Self::new(main, sub);
                content_type.parameters.clone_from(&field.params);
                content_type
            })
            .ok_or_else(|| Error::InvalidContentType(format!("Content-Type malformed: {value:?}")));
        Some(parsed)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;
        write_params(f, &self.parameters)
    }
}

/// Writes `; key="value"` pairs, using RFC 2231 for non-ASCII values.
fn write_params(f: &mut fmt::Formatter<'_>, params: &Params) -> fmt::Result {
    for (key, value) in params {
        if value.is_ascii() {
            let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
            write!(f, "; {key}=\"{escaped}\"")?;
        } else {
            write!(f, "; {key}*=utf-8''{}", percent_encode(value))?;
        }
    }
    Ok(())
}

fn percent_encode(value: &str) -> String {
    let mut result = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            result.push(char::from(byte));
        } else {
            let _ = write!(result, "%{byte:02X}");
        }
    }
    result
}

/// Splits on `;` outside of quoted strings.
fn split_params(s: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => {
                current.push(ch);
                escaped = true;
            }
            '"' => {
                current.push(ch);
                in_quotes = !in_quotes;
            }
            ';' if !in_quotes => segments.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    segments.push(current);
    segments
}

fn unquote(raw: &str) -> String {
    let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) else {
        return raw.to_string();
    };

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                result.push(next);
            }
        } else {
            result.push(ch);
        }
    }
    result
}
