//! Client identity resolution for quota accounting.

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use std::fmt;
use std::net::SocketAddr;

/// Bucket used when a request carries no usable address
pub const ANONYMOUS: &str = "anonymous";

/// Forwarding headers consulted before the socket address, in order
const FORWARDING_HEADERS: [&str; 3] = ["x-forwarded-for", "x-real-ip", "cf-connecting-ip"];

/// One-way digest of a client address. Only used as a map key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientKey([u8; 32]);

impl ClientKey {
    /// Resolve the key for a request.
    ///
    /// The first non-empty forwarding header wins, then the direct peer
    /// address, then the anonymous bucket. For `x-forwarded-for` only the
    /// first hop is used.
    pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        Self::from_address(&client_address(headers, peer))
    }

    /// Digest an address string
    pub fn from_address(address: &str) -> Self {
        let digest = Sha256::digest(address.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// First eight hex digits, enough to correlate log lines
    pub fn short(&self) -> String {
        self.0[..4].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientKey({})", self.short())
    }
}

/// Pick the address string a request should be bucketed under
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    for name in FORWARDING_HEADERS {
        let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) else {
            continue;
        };

        let candidate = if name == "x-forwarded-for" {
            value.split(',').next().unwrap_or_default().trim()
        } else {
            value.trim()
        };

        if !candidate.is_empty() {
            return candidate.to_string();
        }
    }

    match peer {
        Some(addr) => addr.ip().to_string(),
        None => ANONYMOUS.to_string(),
    }
}
