//! Response handling and transformation.
//!
//! # Responsibilities
//! - Derive the download filename from the upload name and output format
//! - Build the `Content-Disposition` header
//! - Relay the upstream status, content type and body to the client
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Only `Content-Type` is copied from upstream; everything else is ours
//! - Headers are fully built before the body starts flowing, so a relay can
//!   never turn into an error halfway through

use axum::{
    body::Body,
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderValue, Response,
    },
};

use crate::error::ProxyError;

/// Format whose download extension differs from its name.
const TEXT_FORMAT: &str = "text";
const TEXT_EXTENSION: &str = "txt";

/// Map a `response_format` value to a file extension.
pub fn extension_for(response_format: &str) -> &str {
    if response_format == TEXT_FORMAT {
        TEXT_EXTENSION
    } else {
        response_format
    }
}

/// Strip a trailing extension: a final `.` followed by at least one
/// character that is neither `.` nor `/`.
fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) => {
            let ext = &name[idx + 1..];
            if ext.is_empty() || ext.contains('/') {
                name
            } else {
                &name[..idx]
            }
        }
        None => name,
    }
}

/// Name of the file the client saves the transcript as.
pub fn download_filename(original_name: &str, response_format: &str) -> String {
    format!(
        "{}.{}",
        strip_extension(original_name),
        extension_for(response_format)
    )
}

/// `attachment; filename="<name>"` with the name quoted per RFC 6266.
pub fn content_disposition(filename: &str) -> Result<HeaderValue, ProxyError> {
    let mut quoted = String::with_capacity(filename.len());
    for c in filename.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            c if c.is_control() => quoted.push('_'),
            c => quoted.push(c),
        }
    }

    let value = format!("attachment; filename=\"{quoted}\"");
    Ok(HeaderValue::from_bytes(value.as_bytes())?)
}

/// Extract the filename from a `Content-Disposition` value.
///
/// Understands the quoted form produced by [`content_disposition`] as well
/// as bare tokens.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let start = value.find("filename=")? + "filename=".len();
    let rest = &value[start..];

    let Some(quoted) = rest.strip_prefix('"') else {
        let token = rest.split(';').next()?.trim();
        return (!token.is_empty()).then(|| token.to_string());
    };

    let mut name = String::new();
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => name.push(chars.next()?),
            '"' => return (!name.is_empty()).then_some(name),
            c => name.push(c),
        }
    }

    // Unterminated quoted string.
    None
}

/// Relay an upstream response to the client.
///
/// Status is copied verbatim, `Content-Type` only if upstream sent one,
/// and the body is streamed through untouched.
pub fn relay(upstream: reqwest::Response, disposition: HeaderValue) -> Result<Response<Body>, ProxyError> {
    let status = upstream.status();
    let content_type = upstream.headers().get(CONTENT_TYPE).cloned();

    let mut builder = Response::builder().status(status);
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }

    let response = builder
        .header(CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(upstream.bytes_stream()))?;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_maps_to_txt() {
        assert_eq!(download_filename("speech.wav", "text"), "speech.txt");
        assert_eq!(download_filename("speech", "text"), "speech.txt");
    }

    #[test]
    fn test_other_formats_map_to_themselves() {
        assert_eq!(download_filename("clip.wav", "srt"), "clip.srt");
        assert_eq!(download_filename("clip.wav", "json"), "clip.json");
        assert_eq!(download_filename("clip.wav", "verbose_json"), "clip.verbose_json");
        assert_eq!(download_filename("clip", "vtt"), "clip.vtt");
    }

    #[test]
    fn test_only_last_extension_is_stripped() {
        assert_eq!(download_filename("meeting.2024.mp3", "srt"), "meeting.2024.srt");
        assert_eq!(download_filename("archive.tar.gz", "text"), "archive.tar.txt");
    }

    #[test]
    fn test_degenerate_names() {
        // A trailing dot is not an extension.
        assert_eq!(download_filename("memo.", "text"), "memo..txt");
        // A dot inside a directory component is not an extension either.
        assert_eq!(download_filename("dir.v2/take", "srt"), "dir.v2/take.srt");
        assert_eq!(download_filename(".wav", "text"), ".txt");
        assert_eq!(download_filename("upload.wav", "text"), "upload.txt");
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let first = download_filename("speech.wav", "srt");
        let second = download_filename("speech.wav", "srt");
        assert_eq!(first, second);
    }

    #[test]
    fn test_content_disposition_plain() {
        let value = content_disposition("speech.txt").unwrap();
        assert_eq!(value, "attachment; filename=\"speech.txt\"");
    }

    #[test]
    fn test_content_disposition_escapes() {
        let value = content_disposition("say \"hi\"\\now\r\n.txt").unwrap();
        assert_eq!(
            value.as_bytes(),
            b"attachment; filename=\"say \\\"hi\\\"\\\\now__.txt\""
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        let value = content_disposition("réunion.txt").unwrap();
        assert_eq!(
            filename_from_disposition(std::str::from_utf8(value.as_bytes()).unwrap()),
            Some("réunion.txt".to_string())
        );
    }

    #[test]
    fn test_filename_from_disposition() {
        assert_eq!(
            filename_from_disposition("attachment; filename=\"clip.srt\""),
            Some("clip.srt".to_string())
        );
        assert_eq!(
            filename_from_disposition("attachment; filename=clip.srt; size=10"),
            Some("clip.srt".to_string())
        );
        assert_eq!(
            filename_from_disposition("attachment; filename=\"a \\\"b\\\".txt\""),
            Some("a \"b\".txt".to_string())
        );
        assert_eq!(filename_from_disposition("attachment"), None);
        assert_eq!(filename_from_disposition("attachment; filename=\"open"), None);
        assert_eq!(filename_from_disposition("attachment; filename=\"\""), None);
    }

    #[test]
    fn test_disposition_round_trip_for_escaped_name() {
        let value = content_disposition("x\"y.txt").unwrap();
        let parsed = filename_from_disposition(value.to_str().unwrap());
        assert_eq!(parsed, Some("x\"y.txt".to_string()));
    }
}
