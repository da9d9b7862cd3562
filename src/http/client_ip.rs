//! Client IP resolution.
//!
//! # Responsibilities
//! - Prefer the first globally routable address in `X-Forwarded-For`
//! - Fall back to `X-Real-Ip`, then to the socket peer address
//!
//! # Design Decisions
//! - Forwarded headers are only consulted when configured as trusted
//! - Private, loopback, link-local and unspecified hops are skipped since they
//!   name proxies inside our own network, not the client

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::Extensions;

use crate::config::ClientIpConfig;
use crate::http::header::HeaderView;
use crate::net::ConnectionInfo;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Resolves the originating client address of a request.
#[derive(Debug, Clone)]
pub struct ClientIpResolver {
    trust_forwarded_headers: bool,
}

impl ClientIpResolver {
    pub fn new(config: &ClientIpConfig) -> Self {
        Self {
            trust_forwarded_headers: config.trust_forwarded_headers,
        }
    }

    /// Resolve from the request headers and connection extensions.
    pub fn resolve(&self, headers: &HeaderView, extensions: &Extensions) -> Option<IpAddr> {
        if self.trust_forwarded_headers {
            let real_ip = headers.get(X_REAL_IP).filter(|v| !v.trim().is_empty());
            let forwarded = headers.get_all(X_FORWARDED_FOR);

            if real_ip.is_some() || !forwarded.is_empty() {
                let from_chain = forwarded
                    .iter()
                    .flat_map(|v| v.split(','))
                    .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
                    .find(is_global);
                if from_chain.is_some() {
                    return from_chain;
                }
                if let Some(ip) = real_ip.and_then(|v| v.trim().parse().ok()) {
                    return Some(ip);
                }
            }
        }

        peer_addr(extensions).map(|addr| addr.ip())
    }
}

impl Default for ClientIpResolver {
    fn default() -> Self {
        Self::new(&ClientIpConfig::default())
    }
}

/// Peer address recorded by the serving layer.
pub fn peer_addr(extensions: &Extensions) -> Option<SocketAddr> {
    extensions
        .get::<ConnectionInfo>()
        .and_then(|info| info.peer)
        .or_else(|| extensions.get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0))
}

fn is_global(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                // 100.64.0.0/10 shared address space
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64))
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            !(v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local
                || (first & 0xFE00) == 0xFC00
                // fe80::/10 link local
                || (first & 0xFFC0) == 0xFE80)
        }
    }
}
