//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every subscribed server stops accepting → in-flight requests finish
//! ```
//!
//! # Design Decisions
//! - One broadcast channel; servers and tests subscribe independently
//! - In-flight requests still finish their facades on shutdown

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
