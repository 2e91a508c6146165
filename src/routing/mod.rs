//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (per-method template scan)
//!     → matcher.rs (segment comparison, capture binding)
//!     → Return: matched operation + path params, NotFound or MethodNotAllowed
//!
//! Route Compilation (at startup):
//!     OperationDescriptor[] (descriptor.rs)
//!     → Parse templates
//!     → Reject streaming and ambiguous registrations
//!     → Sort by specificity
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route

pub mod descriptor;
pub mod matcher;
pub mod router;

pub use descriptor::{BodyBinding, CallKind, OperationDescriptor};
pub use matcher::{PathParams, PathPattern, PatternError};
pub use router::{RegistrationError, RouteError, RouteMatch, RouteTable, RouteTableBuilder};
