//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line (clap)              config file (TOML)
//!     → options.rs                     → loader.rs (parse & deserialize)
//!     └──────── overlay flags on file values ────────┘
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → passed by reference to every subsystem
//! ```
//!
//! # Design Decisions
//! - Config is built once at startup; no process-wide mutable globals
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod options;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use options::Options;
pub use schema::{
    ClientIpConfig, GatewayConfig, LimitsConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    Stage, TlsConfig,
};
