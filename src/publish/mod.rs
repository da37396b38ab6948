//! Publish subsystem.
//!
//! # Data Flow
//! ```text
//! POST /put body
//!     → request.rs (decode channel + raw payload)
//!     → handler.rs (count attempt, assign id, push, count outcome)
//!     → PublishOutcome (200 / 500 at the HTTP boundary)
//! ```
//!
//! # Design Decisions
//! - Every attempt is counted before decoding
//! - Each failure short-circuits the remaining steps; nothing is retried
//! - Errors are logged here and never returned to the client as a body

pub mod handler;
pub mod request;

pub use handler::{PublishError, PublishOutcome, Published, Publisher};
pub use request::{DecodeError, PublishRequest};
