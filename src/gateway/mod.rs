//! HTTP → RPC translation subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP request
//!     → dispatcher.rs (route lookup, body read, per-request cancellation)
//!     → headers.rs (inbound headers → call metadata)
//!     → operation.rs → binder.rs (path params + JSON body → typed request)
//!     → rpc::Invoker (local or remote call)
//!     → render.rs (status, JSON body, metadata headers/trailers)
//!     → HTTP response
//! ```

pub mod binder;
pub mod dispatcher;
pub mod headers;
pub mod operation;
pub mod render;

pub use dispatcher::{DispatchOptions, Dispatcher, DispatcherBuilder};
pub use operation::{InboundCall, Operation, Reply, UnaryOperation};
pub use render::{http_status, Marshal, Marshaler, RenderContext};
