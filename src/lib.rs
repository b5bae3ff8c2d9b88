//! Speech-to-text upload proxy library.
//!
//! Accepts multipart audio uploads, forwards them once to the configured
//! upstream STT service under a fixed deadline, and streams the transcript
//! back as a download.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use error::{Outcome, ProxyError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
