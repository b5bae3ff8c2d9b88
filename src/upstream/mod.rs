//! Upstream STT service subsystem.
//!
//! # Data Flow
//! ```text
//! TranscriptionUpload
//!     → endpoint.rs (resolve URL from the environment, per request)
//!     → client.rs (build multipart, single POST under a deadline)
//!     → reqwest::Response handed back for relaying
//! ```
//!
//! # Design Decisions
//! - Exactly one attempt per request; the client has no retry policy
//! - The connection pool is shared, nothing else is

pub mod client;
pub mod endpoint;

pub use client::UpstreamClient;
pub use endpoint::resolve_endpoint;
