//! Subscription URL Safety
//!
//! Rejects subscription URLs that would let a fetch reach loopback, private
//! or otherwise reserved addresses. Callers validate a URL before it is ever
//! handed to the resolver; the resolver assumes approved URLs.

use anyhow::{anyhow, bail};
use ipnet::{Ipv4Net, Ipv6Net};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;

use crate::Result;

fn blocked_ipv4_ranges() -> &'static Vec<Ipv4Net> {
    static RANGES: OnceLock<Vec<Ipv4Net>> = OnceLock::new();
    RANGES.get_or_init(|| {
        [
            "127.0.0.0/8",   // loopback
            "10.0.0.0/8",    // class A private
            "172.16.0.0/12", // class B private
            "192.168.0.0/16", // class C private
            "169.254.0.0/16", // link-local, cloud metadata
            "0.0.0.0/8",     // unspecified
        ]
        .iter()
        .map(|net| net.parse().unwrap())
        .collect()
    })
}

fn blocked_ipv6_ranges() -> &'static Vec<Ipv6Net> {
    static RANGES: OnceLock<Vec<Ipv6Net>> = OnceLock::new();
    RANGES.get_or_init(|| {
        [
            "::1/128",   // loopback
            "::/128",    // unspecified
            "fc00::/7",  // unique local
            "fe80::/10", // link-local
        ]
        .iter()
        .map(|net| net.parse().unwrap())
        .collect()
    })
}

fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    blocked_ipv4_ranges().iter().any(|net| net.contains(&ip))
}

fn is_private_ipv6(ip: Ipv6Addr) -> bool {
    blocked_ipv6_ranges().iter().any(|net| net.contains(&ip))
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_ipv4(v4),
        IpAddr::V6(v6) => is_private_ipv6(v6),
    }
}

/// Validate a subscription URL before fetching. Resolves the hostname and
/// rejects when any resolved address is private or reserved.
pub async fn validate_subscription_url(raw_url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(raw_url).map_err(|_| anyhow!("Invalid URL format"))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        bail!("URL scheme must be http or https");
    }

    let hostname = parsed
        .host_str()
        .ok_or_else(|| anyhow!("URL has no host"))?
        .to_string();

    // IPv6 literals keep their brackets in host_str().
    let bare_host = hostname.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare_host.parse::<IpAddr>() {
        if is_private_ip(ip) {
            bail!("Access to internal address {} is not allowed", ip);
        }
        return Ok(());
    }

    if hostname == "localhost" {
        bail!("Access to localhost is not allowed");
    }

    let addrs: Vec<IpAddr> = tokio::net::lookup_host((bare_host, 80))
        .await
        .map_err(|_| anyhow!("Could not resolve hostname: {}", hostname))?
        .map(|addr| addr.ip())
        .collect();
    if addrs.is_empty() {
        bail!("Could not resolve hostname: {}", hostname);
    }
    for ip in addrs {
        if is_private_ip(ip) {
            bail!(
                "Hostname {} resolves to internal address {}, rejected",
                hostname,
                ip
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        assert!(validate_subscription_url("ftp://example.com/sub").await.is_err());
        assert!(validate_subscription_url("file:///etc/passwd").await.is_err());
        assert!(validate_subscription_url("not a url").await.is_err());
    }

    #[tokio::test]
    async fn rejects_literal_private_addresses() {
        for url in [
            "http://127.0.0.1/sub",
            "http://10.1.2.3/sub",
            "http://172.16.0.1/sub",
            "http://192.168.1.1/sub",
            "http://169.254.169.254/latest/meta-data",
            "http://[::1]/sub",
            "http://[fe80::1]/sub",
        ] {
            assert!(validate_subscription_url(url).await.is_err(), "{}", url);
        }
    }

    #[tokio::test]
    async fn rejects_localhost_by_name() {
        assert!(validate_subscription_url("http://localhost:8080/sub")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn accepts_public_literal_addresses() {
        assert!(validate_subscription_url("https://1.1.1.1/sub").await.is_ok());
    }
}
