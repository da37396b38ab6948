//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (x-request-id)
//!     → handlers.rs
//!         GET /        → identity string
//!         POST /put    → publish pipeline → 200 / 500, empty body
//!         GET /metrics → text exposition
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
