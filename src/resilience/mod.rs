//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Gateway startup:
//!     → backoff.rs (spacing between backend dial attempts)
//!
//! Per request:
//!     → timeouts.rs (resolve call deadline from grpc-timeout or config)
//!     → invoker enforces the deadline and cancellation
//! ```
//!
//! # Design Decisions
//! - Every bridged call can carry a deadline
//! - Calls are never retried

pub mod backoff;
pub mod timeouts;
