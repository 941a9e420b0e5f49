//! Target resolution: literal addresses first, then DNS.

use crate::error::{ProbeError, Result};
use std::io;
use std::net::IpAddr;

/// Resolve a host string to the address a probe session will use.
///
/// Literal IPv4/IPv6 addresses skip DNS entirely; hostnames go through
/// the system resolver and the first returned address wins.
pub async fn resolve_target(host: &str) -> Result<IpAddr> {
    if host.is_empty() {
        return Err(resolve_error(
            host,
            io::Error::new(io::ErrorKind::InvalidInput, "empty host"),
        ));
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let mut addrs = tokio::net::lookup_host((host, 0u16))
        .await
        .map_err(|source| resolve_error(host, source))?;

    addrs.next().map(|addr| addr.ip()).ok_or_else(|| {
        resolve_error(
            host,
            io::Error::new(io::ErrorKind::NotFound, "no addresses found"),
        )
    })
}

fn resolve_error(host: &str, source: io::Error) -> ProbeError {
    ProbeError::Resolve {
        host: host.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[tokio::test]
    async fn literal_ipv4_skips_dns() {
        let ip = resolve_target("127.0.0.1").await.unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn literal_ipv6_skips_dns() {
        let ip = resolve_target("::1").await.unwrap();
        assert_eq!(ip, IpAddr::V6(Ipv6Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn localhost_resolves() {
        let ip = resolve_target("localhost").await.unwrap();
        assert!(ip.is_loopback());
    }

    #[tokio::test]
    async fn empty_host_is_rejected() {
        let err = resolve_target("").await.unwrap_err();
        assert!(err.to_string().contains("failed to resolve"));
    }
}
