//! Outbound transcription requests.

use std::time::Duration;

use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::ProxyError;
use crate::http::request::{TranscriptionUpload, FILE_FIELD, RESPONSE_FORMAT_FIELD, X_REQUEST_ID};
use crate::resilience::timeouts::with_deadline;

/// Client for the upstream STT service.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            http,
            timeout: config.timeout(),
        })
    }

    /// Total budget for one upstream call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Forward an upload to `endpoint` and wait for the response head.
    ///
    /// The deadline covers connecting, sending the audio and waiting for the
    /// upstream to answer. On expiry the in-flight request is dropped.
    pub async fn transcribe(
        &self,
        endpoint: Url,
        upload: TranscriptionUpload,
        request_id: &str,
    ) -> Result<Response, ProxyError> {
        let form = build_form(upload)?;

        let request = self
            .http
            .post(endpoint)
            .header(X_REQUEST_ID, request_id)
            .multipart(form);

        match with_deadline(self.timeout, request.send()).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(ProxyError::Upstream(e)),
            Err(elapsed) => Err(ProxyError::UpstreamTimeout(elapsed.after)),
        }
    }
}

/// Outbound form: `response_format` first, then the audio.
fn build_form(upload: TranscriptionUpload) -> Result<Form, ProxyError> {
    let filename = upload.file.filename().to_string();
    let length = upload.file.data.len() as u64;

    let mut part = Part::stream_with_length(upload.file.data, length).file_name(filename);
    if let Some(content_type) = upload.file.content_type.as_deref() {
        part = part.mime_str(content_type).map_err(ProxyError::BuildRequest)?;
    }

    Ok(Form::new()
        .text(RESPONSE_FORMAT_FIELD, upload.response_format)
        .part(FILE_FIELD, part))
}
