//! Header collection with case-insensitive names.

use crate::encoding::{
    encode_rfc2047, fold_header, force_rfc2047, has_overlong_word, needs_rfc2047,
};
use std::fmt;

/// Address-family headers whose list values are joined with `", "`.
const ADDRESS_HEADERS: &[&str] = &["to", "cc", "bcc", "from", "sender", "reply-to"];

/// Normalizes a header name to its canonical capitalized form.
///
/// `content-type` becomes `Content-Type`, `X-MAILER` becomes `X-Mailer`.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split('-')
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Checks whether a header carries addresses (`To`, `Resent-From`, ...).
#[must_use]
pub fn is_address_header(name: &str) -> bool {
    let lower = name.to_lowercase();
    let base = lower.strip_prefix("resent-").unwrap_or(&lower);
    ADDRESS_HEADERS.contains(&base)
}

/// A header value: a single string or a list of addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// A single value.
    Scalar(String),
    /// An ordered list of addresses.
    AddressList(Vec<String>),
}

impl HeaderValue {
    /// Iterates over the raw strings held by this value.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            Self::Scalar(value) => std::slice::from_ref(value),
            Self::AddressList(list) => list,
        };
        slice.iter().map(String::as_str)
    }

    /// Checks whether this value renders to nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values().all(str::is_empty)
    }

    /// Renders the value for a header of the given name.
    ///
    /// Lists are joined with `", "` for address headers and with `" "`
    /// otherwise. Non-ASCII text is written as RFC 2047 encoded words; for
    /// address headers only the display names are encoded. Other headers
    /// are also encoded when a single word could not fit on one line. The
    /// result is folded to fit after `name: `.
    #[must_use]
    pub fn render(&self, name: &str) -> String {
        let offset = name.len() + 2;
        let value = if is_address_header(name) {
            self.values()
                .filter(|v| !v.is_empty())
                .map(encode_address)
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            let joined = self.values().collect::<Vec<_>>().join(" ");
            if has_overlong_word(&joined, offset) {
                force_rfc2047(&joined)
            } else {
                encode_rfc2047(&joined)
            }
        };
        fold_header(&value, offset)
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(value: Vec<String>) -> Self {
        Self::AddressList(value)
    }
}

/// Encodes the display name of a `Name <addr@host>` entry when needed.
fn encode_address(entry: &str) -> String {
    match entry.rfind('<') {
        Some(open) if needs_rfc2047(&entry[..open]) => {
            let name = entry[..open].trim().trim_matches('"');
            format!("{} {}", encode_rfc2047(name), &entry[open..])
        }
        _ => entry.to_string(),
    }
}

/// Collection of email headers.
///
/// Names are matched case-insensitively and stored in canonical form.
/// Insertion order is preserved; setting an existing name replaces its
/// value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, HeaderValue)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header value, replacing any existing value.
    pub fn set(&mut self, name: &str, value: impl Into<HeaderValue>) {
        let name = normalize_name(name);
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Gets the value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        let name = normalize_name(name);
        self.entries
            .iter()
            .find(|(existing, _)| *existing == name)
            .map(|(_, value)| value)
    }

    /// Checks whether a header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<HeaderValue> {
        let name = normalize_name(name);
        let index = self.entries.iter().position(|(existing, _)| *existing == name)?;
        Some(self.entries.remove(index).1)
    }

    /// Copies every header from `other`, overriding collisions.
    pub fn merge(&mut self, other: &Self) {
        for (name, value) in other.iter() {
            self.set(name, value.clone());
        }
    }

    /// Returns an iterator over headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the headers sorted by name.
    #[must_use]
    pub fn sorted(&self) -> Vec<(&str, &HeaderValue)> {
        let mut sorted: Vec<_> = self.iter().collect();
        sorted.sort_by(|(a, _), (b, _)| a.cmp(b));
        sorted
    }

    /// Returns the number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.sorted() {
            if value.is_empty() {
                continue;
            }
            write!(f, "{name}: {}\r\n", value.render(name))?;
        }
        Ok(())
    }
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

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("content-type"), "Content-Type");
        assert_eq!(normalize_name("X-MAILER"), "X-Mailer");
        assert_eq!(normalize_name("reply-to"), "Reply-To");
    }

    #[test]
    fn test_headers_set_get_case_insensitive() {
        let mut headers = Headers::new();
        headers.set("content-type", "text/plain");
        assert_eq!(
            headers.get("Content-Type"),
            Some(&HeaderValue::Scalar("text/plain".to_string()))
        );
        assert!(headers.contains("CONTENT-TYPE"));
    }

    #[test]
    fn test_headers_set_replaces_in_place() {
        let mut headers = Headers::new();
        headers.set("To", "alice@example.com");
        headers.set("Subject", "Hi");
        headers.set("to", "bob@example.com");

        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["To", "Subject"]);
        assert_eq!(
            headers.get("To"),
            Some(&HeaderValue::Scalar("bob@example.com".to_string()))
        );
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.set("Subject", "Test");
        assert!(headers.remove("subject").is_some());
        assert!(headers.get("Subject").is_none());
        assert!(headers.is_empty());
    }

    #[test]
    fn test_address_list_render() {
        let value = HeaderValue::AddressList(vec![
            "alice@example.com".to_string(),
            "Bob <bob@example.com>".to_string(),
        ]);
        assert_eq!(value.render("To"), "alice@example.com, Bob <bob@example.com>");
        assert_eq!(value.render("X-List"), "alice@example.com Bob <bob@example.com>");
    }

    #[test]
    fn test_long_address_list_folds_after_commas() {
        let addresses: Vec<String> = (0..80)
            .map(|i| format!("recipient{i:03}@example.com"))
            .collect();
        let rendered = HeaderValue::AddressList(addresses.clone()).render("To");

        let lines: Vec<&str> = rendered.split("\r\n").collect();
        assert!(lines.len() > 1);
        assert!(lines[0].len() + "To: ".len() <= 78);
        for line in &lines {
            assert!(line.len() <= 78);
            assert!(line.trim_end().ends_with(',') || line.ends_with("recipient079@example.com"));
        }
        assert_eq!(rendered.replace("\r\n", ""), addresses.join(", "));
    }

    #[test]
    fn test_overlong_word_is_encoded() {
        let subject = "x".repeat(1200);
        let rendered = HeaderValue::from(subject.as_str()).render("Subject");
        assert!(rendered.starts_with("=?utf-8?B?"));
        assert!(rendered.split("\r\n").all(|line| line.len() <= 998));
        assert_eq!(crate::encoding::decode_rfc2047(&rendered).unwrap(), subject);
    }

    #[test]
    fn test_address_display_name_encoded() {
        let value = HeaderValue::AddressList(vec!["José <jose@example.com>".to_string()]);
        let rendered = value.render("From");
        assert!(rendered.starts_with("=?utf-8?B?"));
        assert!(rendered.ends_with(" <jose@example.com>"));
    }

    #[test]
    fn test_is_address_header() {
        assert!(is_address_header("To"));
        assert!(is_address_header("Resent-From"));
        assert!(is_address_header("reply-to"));
        assert!(!is_address_header("Subject"));
    }

    #[test]
    fn test_display_sorted_and_skips_empty() {
        let mut headers = Headers::new();
        headers.set("subject", "Test");
        headers.set("cc", "");
        headers.set("from", "sender@example.com");

        assert_eq!(
            headers.to_string(),
            "From: sender@example.com\r\nSubject: Test\r\n"
        );
    }
}
