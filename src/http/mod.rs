//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, graceful shutdown)
//!     → request.rs (assign/propagate request ID)
//!     → cors.rs (preflight short-circuit, CORS headers)
//!     → gateway::Dispatcher (match, bind, invoke, render)
//!     → Send to client
//! ```

pub mod cors;
pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
