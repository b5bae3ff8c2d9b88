//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap upstream calls with a deadline
//! - Cancel operations cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the wrapped future is dropped on expiry,
//!   which closes its connection
//! - Timeout errors are distinct from other errors
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The deadline elapsed before the wrapped operation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline of {after:?} exceeded")]
pub struct DeadlineExceeded {
    pub after: Duration,
}

/// Run `operation` for at most `deadline`.
pub async fn with_deadline<F, T>(deadline: Duration, operation: F) -> Result<T, DeadlineExceeded>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(deadline, operation)
        .await
        .map_err(|_| DeadlineExceeded { after: deadline })
}
