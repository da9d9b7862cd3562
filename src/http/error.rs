//! Error types for the request facade.
//!
//! Body read errors are not listed here: they belong to the stream that
//! produced them and reach the caller as that stream's own `axum::Error`.
//! The only body error the facade raises itself is [`BodyError::Closed`].

use thiserror::Error;

/// Failure to build a facade or to rebuild a transport request from it.
#[derive(Debug, Error)]
pub enum ConstructionError {
    /// The current host cannot be used as a URI authority or `Host` header.
    #[error("invalid host {0:?}")]
    InvalidHost(String),

    /// Overrides on the current view produced a request target that does not parse.
    #[error("invalid request target: {0}")]
    InvalidTarget(#[from] axum::http::uri::InvalidUri),

    #[error("invalid request uri: {0}")]
    InvalidUri(#[from] axum::http::uri::InvalidUriParts),
}

/// Errors raised by the instrumented body itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BodyError {
    /// The body was read after the facade finished.
    #[error("read on closed body")]
    Closed,
}

/// Cookie lookup miss, or a cookie that cannot be read or written.
///
/// `NotFound` is the ordinary miss; callers are expected to branch on it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CookieError {
    #[error("named cookie not present")]
    NotFound,

    #[error("malformed cookie header: {0}")]
    Malformed(String),

    /// A cookie being added has a name that is not an RFC 6265 token.
    #[error("invalid cookie name {0:?}")]
    InvalidName(String),
}

/// Invalid header name or value handed to the header view.
#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("invalid header name {0:?}")]
    InvalidName(String),

    #[error("invalid value for header {name}")]
    InvalidValue { name: String },
}
