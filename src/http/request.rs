//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every inbound request
//! - Read the transcription upload out of the multipart body
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing and forwarded upstream
//! - Unknown form fields are skipped; the first `file` and `response_format` win

use axum::{
    body::Bytes,
    extract::Multipart,
    http::{HeaderName, HeaderValue, Request},
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::error::ProxyError;

/// Header carrying the correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Form field holding the audio.
pub const FILE_FIELD: &str = "file";

/// Form field selecting the transcript format.
pub const RESPONSE_FORMAT_FIELD: &str = "response_format";

/// Format used when the client does not choose one.
pub const DEFAULT_RESPONSE_FORMAT: &str = "text";

/// Name used for uploads that arrive without one.
pub const FALLBACK_FILENAME: &str = "upload.wav";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Read the request ID set by the request ID layer.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// The audio file part of an upload.
#[derive(Debug, Clone)]
pub struct AudioFile {
    /// Filename as sent by the client, if any.
    pub original_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl AudioFile {
    /// The client's filename, or [`FALLBACK_FILENAME`] when absent or empty.
    pub fn filename(&self) -> &str {
        match self.original_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => FALLBACK_FILENAME,
        }
    }
}

/// A validated transcription upload.
#[derive(Debug, Clone)]
pub struct TranscriptionUpload {
    pub file: AudioFile,
    /// Forwarded as-is; the upstream decides which values it accepts.
    pub response_format: String,
}

/// Read a transcription upload from a multipart body.
pub async fn read_upload(multipart: &mut Multipart) -> Result<TranscriptionUpload, ProxyError> {
    let mut file: Option<AudioFile> = None;
    let mut response_format: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            FILE_FIELD if file.is_none() => {
                let original_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;

                file = Some(AudioFile {
                    original_name,
                    content_type,
                    data,
                });
            }
            RESPONSE_FORMAT_FIELD if response_format.is_none() => {
                response_format = Some(field.text().await?);
            }
            _ => {
                // Skip unknown and duplicate fields
            }
        }
    }

    let file = file.ok_or(ProxyError::MissingFile)?;

    Ok(TranscriptionUpload {
        file,
        response_format: response_format.unwrap_or_else(|| DEFAULT_RESPONSE_FORMAT.to_string()),
    })
}
