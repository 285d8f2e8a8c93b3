//! Transport that writes documents to files.

use super::Transport;
use crate::config::MailerConfig;
use crate::error::{Error, Result};
use chrono::Local;
use mailwright_mime::{Envelope, WireDocument};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

const SUFFIX_LEN: usize = 4;
const MAX_NAME_ATTEMPTS: usize = 16;

/// Writes each document to `<directory>/<YYYYmmddHHMMSS>_<suffix>.msg`.
///
/// The directory is created on first delivery. Queued and immediate
/// deliveries are handled the same way.
#[derive(Debug, Clone)]
pub struct DirectoryTransport {
    directory: PathBuf,
}

impl DirectoryTransport {
    /// Creates a transport writing into `directory`.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Creates a transport writing into the configured debug directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no debug directory is configured.
    pub fn from_config(config: &MailerConfig) -> Result<Self> {
        config
            .debug_directory
            .clone()
            .map(Self::new)
            .ok_or_else(|| Error::Config("debug_directory is not set".to_string()))
    }

    /// Returns the output directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn file_name() -> String {
        let stamp = Local::now().format("%Y%m%d%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{stamp}_{}.msg", &suffix[..SUFFIX_LEN])
    }

    async fn write(&self, document: &WireDocument) -> Result<PathBuf> {
        fs::create_dir_all(&self.directory).await?;
        let bytes = document.to_bytes();

        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = self.directory.join(Self::file_name());
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(&bytes).await?;
                    file.flush().await?;
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::Transport(format!(
            "Could not find a free file name in {}",
            self.directory.display()
        )))
    }
}

impl Transport for DirectoryTransport {
    async fn deliver(&self, envelope: &Envelope, document: &WireDocument) -> Result<()> {
        let path = self.write(document).await?;
        debug!(
            path = %path.display(),
            sender = %envelope.sender,
            recipients = envelope.recipients.len(),
            "wrote message file"
        );
        Ok(())
    }
}
