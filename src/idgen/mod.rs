//! Unique identifier subsystem.
//!
//! # Data Flow
//! ```text
//! publish request
//!     → flake.rs (sample clock, bump sequence under lock)
//!     → u64 id = elapsed ticks | sequence | machine id
//!     → attached to log lines of that request
//! ```
//!
//! # Design Decisions
//! - 10 ms ticks, 8-bit sequence, 16-bit machine id (39 bits of time ≈ 174 years)
//! - Sequence exhaustion waits for the next tick instead of failing
//! - Small clock regressions reuse the last tick; large ones are an error

pub mod flake;

pub use flake::{machine_id_for, GenerationError, IdGenerator, IdParts};
