//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, handler)
//!     → request.rs (request ID, multipart upload extraction)
//!     → [upstream client forwards the upload]
//!     → response.rs (download filename, headers, streamed relay)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, TranscriptionUpload, X_REQUEST_ID};
pub use server::{AppState, HttpServer, HEALTH_PATH, TRANSCRIBE_PATH};
