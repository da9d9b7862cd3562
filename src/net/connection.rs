//! Per-connection metadata attached to every request.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Record the peer address and whether the connection was TLS-terminated
//! - Carry both to the request facade through request extensions

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Transport facts about the connection a request arrived on.
///
/// Inserted into request extensions by the serving layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub peer: Option<SocketAddr>,
    /// Whether the connection was TLS-terminated before reaching us.
    pub tls: bool,
}

impl ConnectionInfo {
    /// Plain-text connection from `peer`.
    pub fn plain(peer: SocketAddr) -> Self {
        Self {
            id: ConnectionId::new(),
            peer: Some(peer),
            tls: false,
        }
    }

    /// TLS-terminated connection from `peer`.
    pub fn tls(peer: SocketAddr) -> Self {
        Self {
            tls: true,
            ..Self::plain(peer)
        }
    }
}
