//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header::CONTENT_TYPE, HeaderMap, Response},
    routing::post,
    Router,
};
use reqwest::multipart::{Form, Part};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

use stt_proxy::config::ProxyConfig;
use stt_proxy::http::HttpServer;
use stt_proxy::lifecycle::Shutdown;

/// A running proxy instance.
pub struct TestProxy {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self) -> String {
        format!("http://{}/api/stt", self.addr)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config pointing the proxy at `endpoint_env`, on an ephemeral port.
pub fn proxy_config(endpoint_env: &str) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.endpoint_env = endpoint_env.to_string();
    config
}

/// Boot the proxy and return once it is accepting connections.
pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy { addr, shutdown }
}

/// Point `var` at `addr`.
pub fn set_endpoint(var: &str, addr: SocketAddr) {
    std::env::set_var(var, format!("http://{addr}/v1/audio/transcriptions"));
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Upload form the way the browser UI sends it.
pub fn upload_form(filename: &str, audio: &[u8], response_format: Option<&str>) -> Form {
    let part = Part::bytes(audio.to_vec())
        .file_name(filename.to_string())
        .mime_str("audio/wav")
        .unwrap();

    let form = Form::new().part("file", part);
    match response_format {
        Some(format) => form.text("response_format", format.to_string()),
        None => form,
    }
}

/// What the mock upstream answers with.
#[derive(Clone)]
pub struct UpstreamReply {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
    pub delay: Duration,
}

impl UpstreamReply {
    pub fn ok(content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type),
            body: body.into(),
            delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// One request as the upstream saw it.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub request_id: Option<String>,
    pub fields: Vec<RecordedField>,
}

impl RecordedUpload {
    pub fn field(&self, name: &str) -> &RecordedField {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("upstream did not receive field {name}"))
    }
}

#[derive(Clone)]
struct Recorder {
    reply: UpstreamReply,
    uploads: Arc<Mutex<Vec<RecordedUpload>>>,
}

async fn record(
    State(recorder): State<Recorder>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response<Body> {
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        fields.push(RecordedField {
            name: field.name().unwrap_or_default().to_string(),
            file_name: field.file_name().map(str::to_string),
            content_type: field.content_type().map(str::to_string),
            data: field.bytes().await.unwrap().to_vec(),
        });
    }

    recorder.uploads.lock().unwrap().push(RecordedUpload {
        request_id: headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        fields,
    });

    tokio::time::sleep(recorder.reply.delay).await;

    let mut builder = Response::builder().status(recorder.reply.status);
    if let Some(content_type) = recorder.reply.content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    builder.body(Body::from(recorder.reply.body.clone())).unwrap()
}

/// Start an upstream that records every multipart upload and answers with `reply`.
pub async fn start_recording_upstream(
    reply: UpstreamReply,
) -> (SocketAddr, Arc<Mutex<Vec<RecordedUpload>>>) {
    let uploads = Arc::new(Mutex::new(Vec::new()));
    let recorder = Recorder {
        reply,
        uploads: uploads.clone(),
    };

    let app = Router::new()
        .route("/v1/audio/transcriptions", post(record))
        .with_state(recorder);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, uploads)
}

/// Observations from a raw TCP upstream.
#[derive(Clone, Default)]
pub struct ConnectionLog {
    pub accepted: Arc<AtomicU32>,
    pub closed_by_peer: Arc<AtomicBool>,
}

impl ConnectionLog {
    pub fn accepted(&self) -> u32 {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn closed_by_peer(&self) -> bool {
        self.closed_by_peer.load(Ordering::SeqCst)
    }
}

/// Start an upstream that reads requests but never answers.
///
/// Records when the proxy hangs up on it.
pub async fn start_stalling_upstream() -> (SocketAddr, ConnectionLog) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log = ConnectionLog::default();
    let task_log = log.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            task_log.accepted.fetch_add(1, Ordering::SeqCst);
            let log = task_log.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 8192];
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => continue,
                    }
                }
                log.closed_by_peer.store(true, Ordering::SeqCst);
            });
        }
    });

    (addr, log)
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
