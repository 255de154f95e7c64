//! `multipart/form-data` body encoding.
//!
//! [`encode`] is a pure function: the same fields and attachments always
//! produce the same body apart from the boundary, which is freshly generated
//! per call.
//!
//! ```text
//! --<boundary>\r\n
//! Content-Disposition: form-data; name="recipe_name"\r\n
//! \r\n
//! Curry\r\n
//! --<boundary>\r\n
//! Content-Disposition: form-data; name="files"; filename="photo0.jpg"\r\n
//! Content-Type: image/jpeg\r\n
//! \r\n
//! <bytes>\r\n
//! --<boundary>--\r\n
//! ```
//!
//! The boundary is derived from a v4 UUID. It is not checked against the
//! attachment bytes; a collision is possible in principle and accepted.

use crate::error::EncodingError;

/// Field name every attachment part is sent under.
pub const FILES_FIELD: &str = "files";

const BOUNDARY_PREFIX: &str = "----RecipeBoundary";

/// A named binary blob to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    filename: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// A JPEG photo named `photo<index>.jpg`.
    pub fn jpeg(index: usize, bytes: Vec<u8>) -> Self {
        Self::new(format!("photo{}.jpg", index), "image/jpeg", bytes)
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// An encoded request body and the boundary that frames it.
#[derive(Debug, Clone)]
pub struct MultipartRequest {
    pub boundary: String,
    pub body: Vec<u8>,
    /// Number of `files` parts in `body`.
    pub attachment_count: usize,
}

impl MultipartRequest {
    /// Value for the `Content-Type` request header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

fn new_boundary() -> String {
    format!("{}{}", BOUNDARY_PREFIX, uuid::Uuid::new_v4().simple())
}

fn check_header_value(what: &'static str, value: &str) -> Result<(), EncodingError> {
    if value.contains(['\r', '\n', '"']) {
        return Err(EncodingError::InvalidHeaderValue {
            what,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Encode text fields followed by attachments into a multipart body.
///
/// Fields and attachments keep the order they are given in. An attachment
/// that cannot be framed is an error; nothing is skipped silently.
pub fn encode<K, V>(fields: &[(K, V)], attachments: &[Attachment]) -> Result<MultipartRequest, EncodingError>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let boundary = new_boundary();
    let payload_len: usize = attachments.iter().map(|a| a.bytes.len()).sum();
    let mut body = Vec::with_capacity(payload_len + 256 * (fields.len() + attachments.len() + 1));

    for (name, value) in fields {
        let name = name.as_ref();
        check_header_value("field name", name)?;
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_ref().as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    for attachment in attachments {
        check_header_value("filename", &attachment.filename)?;
        check_header_value("MIME type", &attachment.mime_type)?;
        if attachment.bytes.is_empty() {
            return Err(EncodingError::EmptyAttachment {
                filename: attachment.filename.clone(),
            });
        }
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                FILES_FIELD, attachment.filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", attachment.mime_type).as_bytes());
        body.extend_from_slice(&attachment.bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    Ok(MultipartRequest {
        boundary,
        body,
        attachment_count: attachments.len(),
    })
}
