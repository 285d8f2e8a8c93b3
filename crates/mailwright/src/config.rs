//! Mailer configuration.
//!
//! A [`MailerConfig`] is built once by the host application and passed into
//! [`Mailer::new`](crate::Mailer::new). It can be read from flat key/value
//! settings (`mail.default_sender = ...`) or from JSON.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Domain used in generated `Message-Id` headers when none is configured.
pub const DEFAULT_MESSAGE_ID_DOMAIN: &str = "localhost";

/// Mailer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailerConfig {
    /// Sender applied to messages that have none.
    pub default_sender: Option<String>,
    /// Swallow (and log) transport failures instead of returning them.
    ///
    /// Problems with the message itself are always returned.
    pub fail_silently: bool,
    /// Right-hand side of generated `Message-Id` headers.
    pub message_id_domain: String,
    /// Output directory for [`DirectoryTransport`](crate::DirectoryTransport).
    pub debug_directory: Option<PathBuf>,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            default_sender: None,
            fail_silently: false,
            message_id_domain: DEFAULT_MESSAGE_ID_DOMAIN.to_string(),
            debug_directory: None,
        }
    }
}

impl MailerConfig {
    /// Reads `prefix`-qualified keys from flat settings.
    ///
    /// Recognized keys are `default_sender`, `fail_silently`,
    /// `message_id_domain` and `debug_directory`, each preceded by `prefix`
    /// (for example `mail.`). Other keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `fail_silently` is not a boolean.
    pub fn from_settings(settings: &HashMap<String, String>, prefix: &str) -> Result<Self> {
        let get = |key: &str| setting(settings, prefix, key);

        let mut config = Self::default();
        if let Some(sender) = get("default_sender") {
            config.default_sender = Some(sender.to_string());
        }
        if let Some(flag) = get("fail_silently") {
            config.fail_silently = parse_bool(flag)
                .ok_or_else(|| Error::Config(format!("{prefix}fail_silently: not a boolean: {flag:?}")))?;
        }
        if let Some(domain) = get("message_id_domain") {
            config.message_id_domain = domain.to_string();
        }
        if let Some(directory) = get("debug_directory") {
            config.debug_directory = Some(PathBuf::from(directory));
        }

        Ok(config)
    }

    /// Deserializes a configuration from JSON.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serde`] if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn setting<'a>(settings: &'a HashMap<String, String>, prefix: &str, key: &str) -> Option<&'a str> {
    settings
        .get(&format!("{prefix}{key}"))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
