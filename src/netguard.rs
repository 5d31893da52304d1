//! Internal-network access guard for the metrics endpoint.
//!
//! Decides allow/deny from the request's origin: addresses inside the fixed
//! internal ranges are allowed, direct connections that no upstream proxy has
//! annotated are allowed, everything else is rejected with 403.
//!
//! The "no forwarded-for header means direct access" rule is deliberately
//! permissive and assumes a trusted-network deployment behind a well-behaved
//! reverse proxy.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// A contiguous block of addresses: network address plus prefix length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrRange {
    network: IpAddr,
    prefix_len: u8,
}

/// Ranges allowed to scrape metrics: the RFC 1918 blocks, IPv4 loopback, and
/// IPv6 loopback. Covers Docker bridge networks and direct localhost access.
pub const INTERNAL_RANGES: [CidrRange; 5] = [
    CidrRange::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0)), 8),
    CidrRange::new(IpAddr::V4(Ipv4Addr::new(172, 16, 0, 0)), 12),
    CidrRange::new(IpAddr::V4(Ipv4Addr::new(192, 168, 0, 0)), 16),
    CidrRange::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 0)), 8),
    CidrRange::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 128),
];

/// Outcome of the origin check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
}

impl CidrRange {
    /// Create a range from a network address and prefix length.
    ///
    /// Prefix lengths beyond the family's bit width are clamped when
    /// matching.
    pub const fn new(network: IpAddr, prefix_len: u8) -> Self {
        Self {
            network,
            prefix_len,
        }
    }

    /// Whether `addr` falls inside this range.
    ///
    /// Address families never mix: an IPv4 address is not a member of an
    /// IPv6 range, and vice versa.
    pub fn contains(&self, addr: IpAddr) -> bool {
        match (self.network, addr) {
            (IpAddr::V4(network), IpAddr::V4(addr)) => {
                let prefix = u32::from(self.prefix_len.min(32));
                let mask = if prefix == 0 {
                    0
                } else {
                    u32::MAX << (32 - prefix)
                };
                u32::from(addr) & mask == u32::from(network) & mask
            }
            (IpAddr::V6(network), IpAddr::V6(addr)) => {
                // Byte-wise masked compare, stopping once the prefix is
                // exhausted.
                let mut remaining = u32::from(self.prefix_len.min(128));
                for (addr_byte, network_byte) in
                    addr.octets().iter().zip(network.octets().iter())
                {
                    if remaining == 0 {
                        break;
                    }
                    let bits = remaining.min(8) as u8;
                    let mask = 0xffu8 << (8 - bits);
                    if addr_byte & mask != network_byte & mask {
                        return false;
                    }
                    remaining -= u32::from(bits);
                }
                true
            }
            _ => false,
        }
    }
}

/// Decide whether a request origin may reach the metrics endpoint.
///
/// Rules, in order: an internal address allows; absence of a forwarded-for
/// header (direct access) allows; anything else denies. An absent or
/// unparseable remote address never matches a range.
pub fn decide(remote_addr: Option<IpAddr>, has_forwarded_header: bool) -> AccessDecision {
    if let Some(addr) = remote_addr {
        if INTERNAL_RANGES.iter().any(|range| range.contains(addr)) {
            return AccessDecision::Allow;
        }
    }

    if !has_forwarded_header {
        return AccessDecision::Allow;
    }

    AccessDecision::Deny
}

/// Axum middleware enforcing the internal-network rule.
///
/// Denied requests are rejected with 403 before the handler runs.
pub async fn require_internal_network(request: Request, next: Next) -> Response {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());
    let has_forwarded_header = request.headers().contains_key("x-forwarded-for");

    match decide(remote_addr, has_forwarded_header) {
        AccessDecision::Allow => next.run(request).await,
        AccessDecision::Deny => {
            tracing::debug!(remote = ?remote_addr, "Denied external access to metrics endpoint");
            (
                StatusCode::FORBIDDEN,
                "Access denied: metrics endpoint is internal only",
            )
                .into_response()
        }
    }
}
