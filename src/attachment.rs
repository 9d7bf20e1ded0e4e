//! Attachments and embedded images.
//!
//! Callers may use any of the field aliases the API documentation has used over
//! time (`mimetype`/`type`, `filename`/`name`, `file`/`content`,
//! `encoded_file`/`encoded_content`). Everything is normalized to
//! `{type, name, content}` with base64 content.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::MailError;

/// Raw (not yet encoded) attachment content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawContent {
    Text(String),
    Bytes(Vec<u8>),
}

impl RawContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }
}

impl From<Vec<u8>> for RawContent {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for RawContent {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<String> for RawContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RawContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// An attachment or embedded image as a caller supplies it.
///
/// Exactly one of the raw (`file`/`content`) or pre-encoded
/// (`encoded_file`/`encoded_content`) fields should be set. Pre-encoded content
/// wins when both are present.
///
/// # Examples
///
/// ```
/// use mandrill_mailer::AttachmentSpec;
///
/// // Raw bytes, type guessed from the filename
/// let report = AttachmentSpec::from_bytes("report.pdf", b"%PDF".to_vec());
/// assert_eq!(report.mimetype.as_deref(), Some("application/pdf"));
///
/// // Already base64-encoded
/// let logo = AttachmentSpec::encoded("logo.png", "iVBORw0KGgo=").mimetype("image/png");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<RawContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<RawContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded_content: Option<String>,
}

impl AttachmentSpec {
    /// Create an attachment from raw bytes.
    ///
    /// The mimetype is guessed from the filename extension.
    pub fn from_bytes(filename: impl Into<String>, data: impl Into<RawContent>) -> Self {
        let filename = filename.into();
        let mimetype = guess_mimetype(&filename);
        Self {
            mimetype: Some(mimetype),
            filename: Some(filename),
            file: Some(data.into()),
            ..Self::default()
        }
    }

    /// Create an attachment from content that is already base64-encoded.
    pub fn encoded(filename: impl Into<String>, encoded: impl Into<String>) -> Self {
        let filename = filename.into();
        let mimetype = guess_mimetype(&filename);
        Self {
            mimetype: Some(mimetype),
            filename: Some(filename),
            encoded_file: Some(encoded.into()),
            ..Self::default()
        }
    }

    /// Set the mimetype explicitly.
    pub fn mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    fn resolved_type(&self) -> Option<String> {
        self.mimetype.clone().or_else(|| self.kind.clone())
    }

    fn resolved_name(&self) -> Option<String> {
        self.filename.clone().or_else(|| self.name.clone())
    }

    /// Encode into the API shape.
    ///
    /// # Errors
    ///
    /// `MalformedAttachment` when neither raw nor pre-encoded content is set.
    pub fn encode(&self) -> Result<EncodedAttachment, MailError> {
        let name = self.resolved_name();
        let content = match (
            self.encoded_file.as_ref().or(self.encoded_content.as_ref()),
            self.file.as_ref().or(self.content.as_ref()),
        ) {
            (Some(encoded), _) => encoded.clone(),
            (None, Some(raw)) => base64::engine::general_purpose::STANDARD.encode(raw.as_bytes()),
            (None, None) => {
                return Err(MailError::MalformedAttachment(format!(
                    "`{}` has neither file content nor encoded content",
                    name.as_deref().unwrap_or("<unnamed>")
                )))
            }
        };
        Ok(EncodedAttachment {
            kind: self.resolved_type(),
            name,
            content,
        })
    }
}

fn guess_mimetype(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .to_string()
}

/// An attachment in the API's wire shape. `content` is always base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedAttachment {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub content: String,
}

/// Normalize attachments.
///
/// Absent input stays absent (`None`), unlike the merge-var formatters which
/// return an empty list.
pub fn to_attachments(
    specs: Option<&[AttachmentSpec]>,
) -> Result<Option<Vec<EncodedAttachment>>, MailError> {
    specs
        .map(|specs| specs.iter().map(AttachmentSpec::encode).collect())
        .transpose()
}

/// Normalize embedded images.
///
/// Images share the attachment wire shape; the API resolves them by content-ID
/// (`name`) from `cid:` references in the HTML.
pub fn to_images(
    specs: Option<&[AttachmentSpec]>,
) -> Result<Option<Vec<EncodedAttachment>>, MailError> {
    to_attachments(specs)
}
