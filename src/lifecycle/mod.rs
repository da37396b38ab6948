//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Wire subsystems → Spawn background tasks → Serve
//!
//! Shutdown (shutdown.rs):
//!     Running → Draining (stop accepting, finish in-flight) → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listener
//! - Drain waits for in-flight publishes; an optional grace period bounds it
//! - A failed drain is logged and the process still exits 0

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownError, ShutdownState};
pub use startup::{Gateway, StartupError};
