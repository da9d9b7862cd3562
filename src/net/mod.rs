//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → tls.rs (optional TLS material; downgrade to HTTP when missing)
//!     → axum::serve / axum_server (accept loop, ConnectInfo<SocketAddr>)
//!     → connection.rs (tag each request with ConnectionInfo)
//!     → Hand off to HTTP layer (RequestFacade reads peer + TLS state)
//! ```
//!
//! # Design Decisions
//! - TLS is optional and handled transparently; requests only carry a flag
//!   saying whether they arrived over TLS
//! - Connection metadata travels in request extensions, never in globals

pub mod connection;
pub mod tls;

pub use connection::{ConnectionId, ConnectionInfo};
