//! `api.v1.ConfigService`: the service the gateway fronts.
//!
//! # Data Flow
//! ```text
//! routes.rs (HTTP bindings)
//!     ├─ local:  LocalInvoker → service.rs trait → memory.rs
//!     └─ remote: RemoteInvoker → gRPC → server.rs adapter → memory.rs
//! ```
//!
//! # Design Decisions
//! - Messages are hand-written prost types that also carry the JSON mapping
//! - One service trait serves both the in-process and the gRPC path

pub mod memory;
pub mod messages;
pub mod routes;
pub mod server;
pub mod service;

pub use memory::InMemoryConfigService;
pub use routes::{register_local, register_remote};
pub use server::ConfigServiceServer;
pub use service::ConfigService;
