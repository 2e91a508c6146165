//! RPC call subsystem.
//!
//! # Data Flow
//! ```text
//! Typed request + MetadataMap + CancellationToken + deadline
//!     → invoker.rs (LocalInvoker: in-process handler
//!                   RemoteInvoker: unary gRPC over connection.rs)
//!     → metadata.rs (capture header/trailer metadata, merge phases)
//!     → outcome.rs (CallOutcome: Success or Failure, metadata on both)
//! ```
//!
//! # Design Decisions
//! - Backend connection dialled before serving, closed once on shutdown
//! - Every call observes explicit cancellation

pub mod connection;
pub mod invoker;
pub mod metadata;
pub mod outcome;

pub use connection::{ConnectError, ConnectionHandle};
pub use invoker::{Call, Invoker, LocalInvoker, RemoteInvoker};
pub use metadata::{CallMetadata, MetadataMap, TrailerMetadata};
pub use outcome::{code_name, CallError, CallOutcome};
