use bytes::Bytes;
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use tokio::io::AsyncRead;

/// A file sent as one part of a `multipart/form-data` body.
///
/// The contents are read exactly once, while the request body is encoded. An upload
/// is consumed by the request it is attached to and cannot be reused.
pub struct FileUpload {
    /// File name reported to the server
    pub file_name: String,
    /// Stream with the file contents. `None` fails the request before anything is sent.
    pub contents: Option<Box<dyn AsyncRead + Send + Sync + Unpin>>,
    /// Form field name. Defaults to `file`, or `file1`, `file2`, ... for several uploads.
    pub field_name: Option<String>,
    /// Part content type. Defaults to `application/octet-stream`.
    pub mime_type: Option<String>,
}

impl FileUpload {
    pub fn new<S, R>(file_name: S, contents: R) -> Self
    where
        S: Into<String>,
        R: AsyncRead + Send + Sync + Unpin + 'static,
    {
        Self {
            file_name: file_name.into(),
            contents: Some(Box::new(contents)),
            field_name: None,
            mime_type: None,
        }
    }

    /// Upload with in-memory contents.
    pub fn from_bytes<S: Into<String>, B: Into<Bytes>>(file_name: S, contents: B) -> Self {
        Self::new(file_name, Cursor::new(contents.into()))
    }

    /// Opens `path` for upload. The file name is the last path component.
    pub async fn from_disk<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self::new(file_name, file))
    }

    pub fn with_field_name<S: Into<String>>(mut self, field_name: S) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    pub fn with_mime_type<S: Into<String>>(mut self, mime_type: S) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("field_name", &self.field_name)
            .field("mime_type", &self.mime_type)
            .field("has_contents", &self.contents.is_some())
            .finish()
    }
}
