use crate::error::{ProxyError, Result};
use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Parse and check a `url` query parameter before it is fetched.
///
/// Only absolute `http://` and `https://` URLs with a host are accepted.
/// With `block_private` set, **IP literals** in private or reserved ranges
/// are refused too. **Hostnames** are accepted without DNS resolution, so
/// DNS rebinding is not covered.
///
/// # Errors
/// - [`ProxyError::InvalidUrl`] if the URL does not parse
/// - [`ProxyError::InvalidTarget`] for other schemes or a missing host
/// - [`ProxyError::BlockedTarget`] for blocked IP literals
pub fn validate_target(raw: &str, block_private: bool) -> Result<Url> {
    let parsed = Url::parse(raw.trim())?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ProxyError::InvalidTarget(format!(
                "Scheme '{scheme}' not allowed, only http/https are proxied"
            )));
        }
    }

    let host = parsed
        .host()
        .ok_or_else(|| ProxyError::InvalidTarget(format!("No host in URL: {raw}")))?;

    if block_private {
        match host {
            Host::Ipv4(ip) if is_blocked_ipv4(ip) => {
                return Err(ProxyError::BlockedTarget(format!(
                    "Private or reserved IPv4 address not allowed: {ip}"
                )));
            }
            Host::Ipv6(ip) if is_blocked_ipv6(ip) => {
                return Err(ProxyError::BlockedTarget(format!(
                    "Private or reserved IPv6 address not allowed: {ip}"
                )));
            }
            _ => {}
        }
    }

    Ok(parsed)
}

/// Returns `true` for IPv4 addresses in private or reserved ranges.
///
/// Blocked ranges:
/// - `0.0.0.0/8`      — "this" network (RFC 1122)
/// - `10.0.0.0/8`     — RFC 1918 private
/// - `127.0.0.0/8`    — loopback
/// - `169.254.0.0/16` — link-local / cloud-metadata
/// - `172.16.0.0/12`  — RFC 1918 private
/// - `192.168.0.0/16` — RFC 1918 private
fn is_blocked_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();

    a == 0
        || a == 10
        || a == 127
        || (a == 169 && b == 254)
        || (a == 172 && (16..=31).contains(&b))
        || (a == 192 && b == 168)
}

/// Returns `true` for IPv6 loopback, link-local (`fe80::/10`) and
/// unique-local (`fc00::/7`) addresses, and IPv4-mapped forms of blocked
/// IPv4 addresses.
fn is_blocked_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_blocked_ipv4(v4);
    }

    let s = ip.segments();

    ip.is_loopback() || ip.is_unspecified() || (s[0] & 0xffc0) == 0xfe80 || (s[0] & 0xfe00) == 0xfc00
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocked(url: &str) -> bool {
        matches!(validate_target(url, true), Err(ProxyError::BlockedTarget(_)))
    }

    #[test]
    fn accepts_public_http_targets() {
        let url = validate_target("https://cdn.example.com/live/index.m3u8?token=abc", true).unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
        assert!(validate_target("http://1.2.3.4/seg.ts", true).is_ok());
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert!(validate_target("  https://cdn.example.com/a.m3u8 ", false).is_ok());
    }

    #[test]
    fn rejects_unparseable() {
        assert!(matches!(validate_target("", false), Err(ProxyError::InvalidUrl(_))));
        assert!(matches!(validate_target("not-a-url", false), Err(ProxyError::InvalidUrl(_))));
        assert!(matches!(
            validate_target("cdn.example.com/stream.m3u8", false),
            Err(ProxyError::InvalidUrl(_))
        ));
    }

    #[test]
    fn rejects_other_schemes() {
        for url in ["ftp://cdn.example.com/a.ts", "file:///etc/passwd", "data:text/plain,hi"] {
            assert!(
                matches!(validate_target(url, false), Err(ProxyError::InvalidTarget(_))),
                "{url}"
            );
        }
    }

    #[test]
    fn private_ranges_allowed_when_not_blocking() {
        assert!(validate_target("http://127.0.0.1:8080/a.m3u8", false).is_ok());
        assert!(validate_target("http://[::1]/a.m3u8", false).is_ok());
    }

    #[test]
    fn blocks_private_ipv4() {
        assert!(blocked("http://127.0.0.1/stream"));
        assert!(blocked("http://10.1.2.3/stream"));
        assert!(blocked("http://172.16.0.1/stream"));
        assert!(blocked("http://172.31.255.255/stream"));
        assert!(blocked("http://192.168.1.1/stream"));
        assert!(blocked("http://169.254.169.254/latest/meta-data/"));
        assert!(blocked("http://0.0.0.0/stream"));
    }

    #[test]
    fn range_boundaries_not_blocked() {
        assert!(!blocked("http://172.15.255.255/stream"));
        assert!(!blocked("http://172.32.0.0/stream"));
    }

    #[test]
    fn blocks_private_ipv6() {
        assert!(blocked("http://[::1]/stream"));
        assert!(blocked("http://[fe80::1]/stream"));
        assert!(blocked("http://[fd00::1]/stream"));
        assert!(blocked("http://[::ffff:127.0.0.1]/stream"));
        assert!(!blocked("http://[2001:db8::1]/stream"));
    }

    #[test]
    fn hostnames_are_not_resolved() {
        assert!(!blocked("http://localhost.example.com/stream"));
    }
}
