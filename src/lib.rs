//! TaskQ Redis Publisher Library

pub mod cli;
pub mod config;
pub mod http;
pub mod idgen;
pub mod lifecycle;
pub mod observability;
pub mod publish;
pub mod queue;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::{Gateway, Shutdown};
