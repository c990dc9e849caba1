//! `multipart/form-data` writer.
//!
//! Data fields come first, in insertion order, followed by the files in the order
//! they were added. Each upload is read to its end exactly once.
use crate::errors::RequestError;
use crate::net::upload::FileUpload;
use bytes::{BufMut, BytesMut};
use indexmap::IndexMap;
use rand::Rng;
use std::fmt::Write;
use tokio::io::AsyncReadExt;

const DEFAULT_FILE_MIME: &str = "application/octet-stream";

/// Generates a fresh random boundary: 30 random bytes, hex encoded.
pub fn generate_boundary() -> String {
    let mut raw = [0u8; 30];
    rand::rng().fill(&mut raw[..]);

    raw.iter().fold(String::with_capacity(60), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Field name for the upload at `idx` when the caller did not name it.
fn default_field_name(idx: usize, total: usize) -> String {
    if total > 1 {
        format!("file{}", idx + 1)
    } else {
        "file".to_string()
    }
}

pub(super) async fn encode(
    boundary: &str,
    fields: &IndexMap<String, String>,
    files: Vec<FileUpload>,
) -> Result<BytesMut, RequestError> {
    // Reject missing streams before reading anything
    if let Some(upload) = files.iter().find(|f| f.contents.is_none()) {
        return Err(RequestError::InvalidFileUpload(format!(
            "file upload {:?} has no contents",
            upload.file_name
        )));
    }

    let mut out = BytesMut::new();

    for (name, value) in fields {
        put_part_header(
            &mut out,
            boundary,
            &format!("form-data; name=\"{}\"", escape_quotes(name)),
            None,
        );
        out.put_slice(value.as_bytes());
        out.put_slice(b"\r\n");
    }

    let total = files.len();
    for (idx, upload) in files.into_iter().enumerate() {
        let FileUpload {
            file_name,
            contents,
            field_name,
            mime_type,
        } = upload;

        let field_name = field_name.unwrap_or_else(|| default_field_name(idx, total));
        put_part_header(
            &mut out,
            boundary,
            &format!(
                "form-data; name=\"{}\"; filename=\"{}\"",
                escape_quotes(&field_name),
                escape_quotes(&file_name)
            ),
            Some(mime_type.as_deref().unwrap_or(DEFAULT_FILE_MIME)),
        );

        let mut data = Vec::new();
        if let Some(mut reader) = contents {
            reader
                .read_to_end(&mut data)
                .await
                .map_err(|source| RequestError::FileReadError {
                    file_name: file_name.clone(),
                    source,
                })?;
        }
        log::debug!("multipart: {} bytes from {:?}", data.len(), file_name);

        out.put_slice(&data);
        out.put_slice(b"\r\n");
    }

    out.put_slice(format!("--{boundary}--\r\n").as_bytes());
    Ok(out)
}

fn put_part_header(out: &mut BytesMut, boundary: &str, disposition: &str, content_type: Option<&str>) {
    out.put_slice(format!("--{boundary}\r\n").as_bytes());
    out.put_slice(format!("Content-Disposition: {disposition}\r\n").as_bytes());
    if let Some(content_type) = content_type {
        out.put_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
    }
    out.put_slice(b"\r\n");
}
