//! HTTP-to-gRPC translation gateway.
//!
//! Accepts REST-style HTTP requests, turns each into a unary call against
//! `api.v1.ConfigService` (in process or over gRPC) and renders the outcome
//! back as JSON over HTTP.

pub mod api;
pub mod config;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod rpc;

pub use config::schema::GatewayConfig;
pub use gateway::Dispatcher;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
