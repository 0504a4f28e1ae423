//! Target resolution.
//!
//! A target is an IPv4 literal or a hostname. Hostnames go through the
//! system resolver first (getaddrinfo via `tokio::net::lookup_host`) and fall
//! back to a direct DNS query when that yields no IPv4 address.

use crate::error::ResolveError;
use std::net::{IpAddr, Ipv4Addr};
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;
use tracing::debug;

/// Resolve `target` to the IPv4 address that will be scanned.
pub async fn resolve(target: &str) -> Result<Ipv4Addr, ResolveError> {
    let target = target.trim();

    if let Ok(ip) = target.parse::<IpAddr>() {
        return match ip {
            IpAddr::V4(v4) => Ok(v4),
            IpAddr::V6(_) => Err(ResolveError::NoIpv4Address(target.to_string())),
        };
    }

    if target.is_empty() {
        return Err(ResolveError::InvalidTarget(target.to_string()));
    }

    match lookup_system(target).await {
        Ok(Some(addr)) => return Ok(addr),
        Ok(None) => debug!(host = target, "system resolver returned no IPv4 address"),
        Err(e) => debug!(host = target, error = %e, "system resolver failed"),
    }

    lookup_dns(target).await
}

/// First IPv4 address from the system resolver.
async fn lookup_system(host: &str) -> std::io::Result<Option<Ipv4Addr>> {
    let addrs = tokio::net::lookup_host((host, 0)).await?;
    Ok(addrs.into_iter().find_map(|addr| match addr.ip() {
        IpAddr::V4(v4) => Some(v4),
        IpAddr::V6(_) => None,
    }))
}

/// First IPv4 address from a direct DNS query.
async fn lookup_dns(host: &str) -> Result<Ipv4Addr, ResolveError> {
    let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());

    let response = resolver
        .lookup_ip(host)
        .await
        .map_err(|e| ResolveError::LookupFailed {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

    response
        .iter()
        .find_map(|ip| match ip {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| ResolveError::NoIpv4Address(host.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_ipv4_literal() {
        let addr = resolve("10.0.0.5").await.unwrap();
        assert_eq!(addr, Ipv4Addr::new(10, 0, 0, 5));
    }

    #[tokio::test]
    async fn test_resolve_trims_whitespace() {
        assert_eq!(resolve(" 127.0.0.1 ").await.unwrap(), Ipv4Addr::LOCALHOST);
    }

    #[tokio::test]
    async fn test_resolve_rejects_ipv6_literal() {
        assert!(matches!(
            resolve("::1").await,
            Err(ResolveError::NoIpv4Address(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_rejects_empty_target() {
        assert!(matches!(
            resolve("").await,
            Err(ResolveError::InvalidTarget(_))
        ));
        assert!(matches!(
            resolve("   ").await,
            Err(ResolveError::InvalidTarget(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_name_reaches_lookup() {
        // Unusual names are left to the resolvers rather than rejected up front.
        assert!(matches!(
            resolve("no_such_host.invalid").await,
            Err(ResolveError::LookupFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_localhost() {
        assert_eq!(resolve("localhost").await.unwrap(), Ipv4Addr::LOCALHOST);
    }
}
