//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (enforce the total upstream budget)
//!     → On expiry: call cancelled, 504 to the caller
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries: uploads go to a metered upstream and must not be submitted twice

pub mod timeouts;

pub use timeouts::{with_deadline, DeadlineExceeded};
