//! Client / proxy IP chain reconstruction.
//!
//! Assumes each proxy appends the address it received the request from to
//! `X-Forwarded-For`, left to right. Nothing here authenticates the chain:
//! any client can forge the header.

use std::net::IpAddr;

use tracing::debug;

use crate::models::request::IpChain;

pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Derives target, client and up to two proxy addresses for a request.
#[derive(Debug, Clone, Default)]
pub struct ClientChainResolver {
    validate_forwarded_for: bool,
}

impl ClientChainResolver {
    pub fn new(validate_forwarded_for: bool) -> Self {
        Self {
            validate_forwarded_for,
        }
    }

    /// `remote_addr` is the connection peer (`ip:port` or `[v6]:port`),
    /// `host` the declared Host (authority) of the request.
    pub fn resolve(&self, remote_addr: &str, host: &str, forwarded_for: Option<&str>) -> IpChain {
        let mut chain = split_forwarded_for(forwarded_for.unwrap_or(""));
        if self.validate_forwarded_for {
            let before = chain.len();
            chain.retain(|entry| entry.parse::<IpAddr>().is_ok());
            if chain.len() != before {
                debug!(
                    dropped = before - chain.len(),
                    "Discarded non-IP X-Forwarded-For entries"
                );
            }
        }

        let mut entries = chain.into_iter();
        let client_ip = match entries.next() {
            Some(first) => first,
            None => extract_host(remote_addr).to_string(),
        };

        IpChain {
            client_ip,
            proxy1_ip: entries.next().unwrap_or_default(),
            proxy2_ip: entries.next().unwrap_or_default(),
            target_ip: extract_host(host).to_string(),
        }
    }
}

/// Strip a trailing `:port` and IPv6 brackets from an address.
///
/// A bare IPv6 literal (more than one colon, no brackets) is returned as is.
pub fn extract_host(addr: &str) -> &str {
    let addr = addr.trim();
    if let Some(rest) = addr.strip_prefix('[') {
        return match rest.find(']') {
            Some(end) => &rest[..end],
            None => rest,
        };
    }
    match addr.rfind(':') {
        Some(idx) if addr[..idx].find(':').is_none() => &addr[..idx],
        _ => addr,
    }
}

/// Split a forwarded-for value into trimmed segments. A blank value
/// yields an empty chain.
pub fn split_forwarded_for(value: &str) -> Vec<String> {
    if value.trim().is_empty() {
        return Vec::new();
    }
    value.split(',').map(|s| s.trim().to_string()).collect()
}
