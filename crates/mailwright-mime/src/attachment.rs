//! File attachments and their lowering into MIME parts.

use crate::charset;
use crate::content_type::{ContentType, ParamValue};
use crate::error::{Error, Result};
use crate::part::{Body, MailPart};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::debug;

/// Disposition used when none is given.
pub const DEFAULT_DISPOSITION: &str = "attachment";

/// Transfer encoding used when none is given.
pub const DEFAULT_TRANSFER_ENCODING: &str = "base64";

enum Origin {
    Path(PathBuf),
    Reader(Box<dyn Read + Send>),
}

struct LazyInner {
    origin: Mutex<Option<Origin>>,
    cache: OnceLock<Vec<u8>>,
}

/// A data source that is read at most once, on first use.
///
/// Clones share the same source and cache, so a message can be compiled
/// any number of times without re-reading an exhausted stream.
#[derive(Clone)]
pub struct LazySource {
    inner: Arc<LazyInner>,
}

impl LazySource {
    fn from_origin(origin: Origin) -> Self {
        Self {
            inner: Arc::new(LazyInner {
                origin: Mutex::new(Some(origin)),
                cache: OnceLock::new(),
            }),
        }
    }

    /// Creates a source that reads a file from disk.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::from_origin(Origin::Path(path.into()))
    }

    /// Creates a source that drains a reader.
    #[must_use]
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self::from_origin(Origin::Reader(Box::new(reader)))
    }

    /// Returns the source's bytes, reading them on the first call.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails, or if an earlier read failed and
    /// the source is gone.
    pub fn bytes(&self) -> Result<&[u8]> {
        if let Some(bytes) = self.inner.cache.get() {
            return Ok(bytes.as_slice());
        }

        let mut origin = self
            .inner
            .origin
            .lock()
            .map_err(|_| Error::MissingData("Attachment source lock poisoned".to_string()))?;

        // Another caller may have filled the cache while we waited
        if let Some(bytes) = self.inner.cache.get() {
            return Ok(bytes.as_slice());
        }

        let source = origin
            .take()
            .ok_or_else(|| Error::MissingData("Attachment source already consumed".to_string()))?;
        let mut data = Vec::new();
        match source {
            Origin::Path(path) => {
                File::open(&path)?.read_to_end(&mut data)?;
                debug!(path = %path.display(), bytes = data.len(), "read attachment file");
            }
            Origin::Reader(mut reader) => {
                reader.read_to_end(&mut data)?;
                debug!(bytes = data.len(), "read attachment stream");
            }
        }

        Ok(self.inner.cache.get_or_init(|| data).as_slice())
    }

    /// Checks whether the source has already been read.
    #[must_use]
    pub fn is_materialized(&self) -> bool {
        self.inner.cache.get().is_some()
    }
}

impl fmt::Debug for LazySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySource")
            .field("materialized", &self.is_materialized())
            .finish_non_exhaustive()
    }
}

/// Attachment payload.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Text data.
    Text(String),
    /// Binary data.
    Binary(Vec<u8>),
    /// Data read lazily from a file or stream.
    Lazy(LazySource),
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}

impl From<&[u8]> for Payload {
    fn from(value: &[u8]) -> Self {
        Self::Binary(value.to_vec())
    }
}

impl From<LazySource> for Payload {
    fn from(value: LazySource) -> Self {
        Self::Lazy(value)
    }
}

/// A file attachment, or the payload of a message body with custom
/// content type or transfer encoding.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// File name; only the last path component is written to headers.
    pub filename: Option<String>,
    /// Content type, optionally with parameters (`text/plain; charset=utf-8`).
    pub content_type: Option<String>,
    /// Content disposition, optionally with parameters.
    pub disposition: String,
    /// Transfer encoding; `None` lets the compiler choose.
    pub transfer_encoding: Option<String>,
    /// Payload.
    pub data: Option<Payload>,
}

impl Attachment {
    /// Creates an attachment.
    ///
    /// Without `data`, the file named by `filename` is read lazily. Without
    /// an explicit `content_type`, the type is guessed from the file name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingData`] if neither a filename nor data is
    /// given, and [`Error::ContentTypeUnresolved`] if a filename is given
    /// whose type cannot be guessed and no content type is given.
    pub fn new(
        filename: Option<String>,
        content_type: Option<String>,
        data: Option<Payload>,
    ) -> Result<Self> {
        let data = match (data, &filename) {
            (Some(data), _) => data,
            (None, Some(path)) => Payload::Lazy(LazySource::from_path(path)),
            (None, None) => {
                return Err(Error::MissingData(
                    "An attachment needs a filename or data".to_string(),
                ));
            }
        };

        if content_type.is_none() {
            if let Some(name) = &filename {
                if guess_content_type(name).is_none() {
                    return Err(Error::ContentTypeUnresolved(format!(
                        "No content type given, and couldn't guess from the filename: {name:?}"
                    )));
                }
            }
        }

        Ok(Self {
            filename,
            content_type,
            disposition: DEFAULT_DISPOSITION.to_string(),
            transfer_encoding: Some(DEFAULT_TRANSFER_ENCODING.to_string()),
            data: Some(data),
        })
    }

    /// Creates an attachment from in-memory data with no filename.
    #[must_use]
    pub fn from_data(data: impl Into<Payload>) -> Self {
        Self {
            filename: None,
            content_type: None,
            disposition: DEFAULT_DISPOSITION.to_string(),
            transfer_encoding: Some(DEFAULT_TRANSFER_ENCODING.to_string()),
            data: Some(data.into()),
        }
    }

    /// Creates an attachment that reads a file on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the path has no file name or its content type
    /// cannot be guessed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::MissingData(format!("Path has no file name: {}", path.display())))?;
        Self::new(
            Some(name),
            None,
            Some(Payload::Lazy(LazySource::from_path(path))),
        )
    }

    /// Creates an attachment that drains `reader` on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type cannot be guessed from the
    /// filename.
    pub fn from_reader(filename: impl Into<String>, reader: impl Read + Send + 'static) -> Result<Self> {
        Self::new(
            Some(filename.into()),
            None,
            Some(Payload::Lazy(LazySource::from_reader(reader))),
        )
    }

    /// Sets the file name.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Sets the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the disposition.
    #[must_use]
    pub fn with_disposition(mut self, disposition: impl Into<String>) -> Self {
        self.disposition = disposition.into();
        self
    }

    /// Sets the transfer encoding.
    #[must_use]
    pub fn with_transfer_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.transfer_encoding = Some(encoding.into());
        self
    }

    /// Reads any lazy source now, so later compilations never touch it.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the source fails.
    pub fn materialize(&self) -> Result<()> {
        if let Some(Payload::Lazy(source)) = &self.data {
            source.bytes()?;
        }
        Ok(())
    }

    /// Lowers this attachment into a MIME part.
    ///
    /// The content type is the explicit one, else the one guessed from the
    /// filename, else `default_content_type`. Text types without a charset
    /// get one by negotiation. The payload is not transfer-encoded here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingData`] without data,
    /// [`Error::ContentTypeUnresolved`] if no content type can be found, and
    /// any error from reading a lazy source.
    pub fn to_mail_part(&self, default_content_type: Option<&str>) -> Result<MailPart> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| Error::MissingData("Attachment has no data".to_string()))?;

        let resolved = self
            .content_type
            .clone()
            .or_else(|| self.filename.as_deref().and_then(guess_content_type))
            .or_else(|| default_content_type.map(str::to_string))
            .ok_or_else(|| {
                Error::ContentTypeUnresolved(format!(
                    "No content type for attachment {:?}",
                    self.filename
                ))
            })?;

        let mut content_type = ParamValue::parse(&resolved)?;
        let mut disposition = ParamValue::parse(&self.disposition)?;

        let filename = self
            .filename
            .as_deref()
            .or_else(|| disposition.param("filename"))
            .map(base_name);
        if let Some(name) = filename {
            content_type.set_param("name", name.clone());
            disposition.set_param("filename", name);
        }

        let is_text = ContentType::from_field(&content_type)
            .transpose()?
            .is_some_and(|ct| ct.is_text());

        let mut body = match data {
            Payload::Text(text) if is_text => Body::Text(text.clone()),
            Payload::Text(text) => Body::Binary(text.clone().into_bytes()),
            Payload::Binary(bytes) => Body::Binary(bytes.clone()),
            Payload::Lazy(source) => Body::Binary(source.bytes()?.to_vec()),
        };

        if is_text && content_type.param("charset").is_none() {
            // Undecodable bytes stay raw; the compiler rejects them if not ASCII
            if let Body::Binary(bytes) = &body {
                if let Ok(text) = String::from_utf8(bytes.clone()) {
                    body = Body::Text(text);
                }
            }
            if let Body::Text(text) = &body {
                let (selected, _) = charset::negotiate(text);
                content_type.set_param("charset", selected.name());
            }
        }

        Ok(MailPart {
            content_type,
            content_disposition: disposition,
            transfer_encoding: self.transfer_encoding.clone(),
            body: Some(body),
            ..MailPart::default()
        })
    }
}

/// Guesses a MIME type from a file name's extension.
#[must_use]
pub fn guess_content_type(filename: &str) -> Option<String> {
    mime_guess::from_path(filename)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

/// Strips directory components from a file name.
fn base_name(name: &str) -> String {
    name.rsplit(['/', '\\']).next().unwrap_or(name).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingReader {
        inner: Cursor<Vec<u8>>,
        reads: Arc<AtomicUsize>,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read(buf)
        }
    }

    #[test]
    fn test_data_from_string() {
        let attachment = Attachment::from_data("foo");
        assert!(attachment.filename.is_none());
        assert_eq!(attachment.disposition, "attachment");
        assert_eq!(attachment.transfer_encoding.as_deref(), Some("base64"));
        assert!(matches!(attachment.data, Some(Payload::Text(ref t)) if t == "foo"));
    }

    #[test]
    fn test_new_requires_filename_or_data() {
        assert!(matches!(
            Attachment::new(None, None, None),
            Err(Error::MissingData(_))
        ));
    }

    #[test]
    fn test_new_infers_content_type_or_fails() {
        assert!(Attachment::new(Some("photo.jpg".into()), None, Some("x".into())).is_ok());
        assert!(matches!(
            Attachment::new(Some("mystery.zzqx".into()), None, Some("x".into())),
            Err(Error::ContentTypeUnresolved(_))
        ));
        assert!(
            Attachment::new(
                Some("mystery.zzqx".into()),
                Some("application/x-mystery".into()),
                Some("x".into())
            )
            .is_ok()
        );
    }

    #[test]
    fn test_lowering_uses_default_content_type() {
        let part = Attachment::from_data("hello")
            .to_mail_part(Some("text/html"))
            .unwrap();
        assert_eq!(part.mime_type(), Some("text/html"));
        assert_eq!(part.content_type.param("charset"), Some("us-ascii"));

        assert!(matches!(
            Attachment::from_data("hello").to_mail_part(None),
            Err(Error::ContentTypeUnresolved(_))
        ));
    }

    #[test]
    fn test_lowering_without_data() {
        let mut attachment = Attachment::from_data("x");
        attachment.data = None;
        assert!(matches!(
            attachment.to_mail_part(Some("text/plain")),
            Err(Error::MissingData(_))
        ));
    }

    #[test]
    fn test_filename_written_to_both_params() {
        let attachment = Attachment::new(
            Some("../../etc/report.pdf".into()),
            None,
            Some(vec![1u8, 2].into()),
        )
        .unwrap();
        let part = attachment.to_mail_part(None).unwrap();
        assert_eq!(part.mime_type(), Some("application/pdf"));
        assert_eq!(part.content_type.param("name"), Some("report.pdf"));
        assert_eq!(part.content_disposition.param("filename"), Some("report.pdf"));
        assert_eq!(part.content_disposition.value.as_deref(), Some("attachment"));
    }

    #[test]
    fn test_filename_adopted_from_disposition() {
        let attachment = Attachment::from_data(vec![0u8])
            .with_content_type("application/octet-stream")
            .with_disposition("inline; filename=\"dir/image.bin\"");
        let part = attachment.to_mail_part(None).unwrap();
        assert_eq!(part.content_type.param("name"), Some("image.bin"));
        assert_eq!(part.content_disposition.param("filename"), Some("image.bin"));
        assert_eq!(part.content_disposition.value.as_deref(), Some("inline"));
    }

    #[test]
    fn test_explicit_filename_beats_disposition() {
        let attachment = Attachment::from_data(vec![0u8])
            .with_filename("real.bin")
            .with_content_type("application/octet-stream")
            .with_disposition("attachment; filename=fake.bin");
        let part = attachment.to_mail_part(None).unwrap();
        assert_eq!(part.content_disposition.param("filename"), Some("real.bin"));
    }

    #[test]
    fn test_text_charset_negotiated_but_not_encoded() {
        let part = Attachment::from_data("niño")
            .with_content_type("text/plain")
            .to_mail_part(None)
            .unwrap();
        assert_eq!(part.content_type.param("charset"), Some("iso-8859-1"));
        assert_eq!(part.body, Some(Body::Text("niño".to_string())));
    }

    #[test]
    fn test_declared_charset_kept() {
        let part = Attachment::from_data("niño")
            .with_content_type("text/plain; charset=utf-8")
            .to_mail_part(None)
            .unwrap();
        assert_eq!(part.content_type.param("charset"), Some("utf-8"));
    }

    #[test]
    fn test_utf8_bytes_for_text_become_text() {
        let part = Attachment::from_data("☃".as_bytes())
            .with_content_type("text/plain")
            .to_mail_part(None)
            .unwrap();
        assert_eq!(part.content_type.param("charset"), Some("utf-8"));
        assert_eq!(part.body, Some(Body::Text("☃".to_string())));
    }

    #[test]
    fn test_lazy_reader_read_once() {
        let reads = Arc::new(AtomicUsize::new(0));
        let reader = CountingReader {
            inner: Cursor::new(b"streamed".to_vec()),
            reads: Arc::clone(&reads),
        };
        let attachment = Attachment::from_reader("notes.txt", reader).unwrap();

        let first = attachment.to_mail_part(None).unwrap();
        let after_first = reads.load(Ordering::SeqCst);
        let second = attachment.clone().to_mail_part(None).unwrap();

        assert_eq!(first, second);
        assert_eq!(reads.load(Ordering::SeqCst), after_first);
        assert_eq!(second.body, Some(Body::Text("streamed".to_string())));
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, b"a,b\n1,2\n").unwrap();

        let attachment = Attachment::from_path(&path).unwrap();
        assert_eq!(attachment.filename.as_deref(), Some("data.csv"));
        attachment.materialize().unwrap();

        // The cached bytes survive the file going away
        std::fs::remove_file(&path).unwrap();
        let part = attachment.to_mail_part(None).unwrap();
        assert_eq!(part.mime_type(), Some("text/csv"));
        assert_eq!(part.body, Some(Body::Text("a,b\n1,2\n".to_string())));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let attachment = Attachment::new(Some("/nonexistent/dir/file.txt".into()), None, None).unwrap();
        assert!(matches!(attachment.to_mail_part(None), Err(Error::Io(_))));
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("a.png").as_deref(), Some("image/png"));
        assert_eq!(guess_content_type("a.HTML").as_deref(), Some("text/html"));
        assert_eq!(guess_content_type("noextension"), None);
    }
}
