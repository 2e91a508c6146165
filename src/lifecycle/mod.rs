//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Dial backend / build local service → Register operations
//!     → Bind listener → Serve
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Token cancelled → Stop accepting → Drain requests → Close backend connection
//! ```
//!
//! # Design Decisions
//! - Ordered startup: backend first, then dispatcher, then listener
//! - One token drives every shutdown observer

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_dispatcher, run, StartupError};
