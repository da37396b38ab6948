//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → cli.rs flags override individual fields
//!     → validation.rs (resolve addresses, range checks)
//!     → GatewayConfig + ResolvedAddresses (immutable)
//!     → handed to lifecycle::startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults, so no file is needed at all
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    GatewayConfig, IdConfig, ListenerConfig, ObservabilityConfig, RedisConfig, ShutdownConfig,
    WatcherConfig,
};
pub use validation::{validate_config, ResolvedAddresses, ValidationError};
