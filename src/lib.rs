//! Metered request facade for an HTTP gateway.
//!
//! Wraps each inbound request in a [`RequestFacade`]: middleware can read and
//! override method, host, path, query, headers and body, while the facade
//! keeps an accurate count of request-line + header bytes plus body bytes
//! actually read.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::GatewayConfig;
pub use http::{HttpServer, RequestFacade, SizeMeter};
pub use lifecycle::Shutdown;
