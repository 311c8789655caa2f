//! The allow-list consulted by the validator.

use std::collections::BTreeSet;
use std::net::IpAddr;

/// Schemes and hostnames a download may target.
///
/// Created via [`PolicyBuilder`](crate::PolicyBuilder) or
/// [`Config::policy`](crate::Config::policy). Once built it cannot be
/// modified: fields are private and there are no `&mut self` methods, so a
/// single instance can be shared across requests without locking.
///
/// # Matching
///
/// - Schemes: exact, case-insensitive.
/// - Hosts: exact membership of the parsed hostname.
/// - IP literals: exact membership of the address, whatever spelling the URL
///   used. Subdomain rules never apply to them.
/// - Subdomains: only for parents registered with
///   [`allow_subdomains_of`](crate::PolicyBuilder::allow_subdomains_of), and
///   only on a label boundary. The parent itself is not implied.
///
/// # Example
///
/// ```rust
/// use download_jail::PolicyBuilder;
///
/// let policy = PolicyBuilder::new()
///     .allow_scheme("https")
///     .allow_host("cdn.example.com")
///     .build();
///
/// assert!(policy.is_scheme_allowed("HTTPS"));
/// assert!(policy.is_host_allowed("cdn.example.com"));
/// assert!(!policy.is_host_allowed("cdn.example.com.evil.net"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowListPolicy {
    pub(crate) schemes: BTreeSet<String>,
    pub(crate) hosts: BTreeSet<String>,
    pub(crate) ips: BTreeSet<IpAddr>,
    pub(crate) subdomains_of: BTreeSet<String>,
}

impl AllowListPolicy {
    /// Check whether a scheme is allowed. Case-insensitive.
    pub fn is_scheme_allowed(&self, scheme: &str) -> bool {
        self.schemes.contains(&scheme.to_ascii_lowercase())
    }

    /// Check whether a parsed hostname is allowed.
    ///
    /// `host` must come from a URL parser, never from raw URL text. A
    /// canonical IP literal (IPv6 with or without brackets) is checked
    /// against the allowed addresses only.
    pub fn is_host_allowed(&self, host: &str) -> bool {
        if let Some(ip) = parse_ip_literal(host) {
            return self.is_ip_allowed(ip);
        }
        let host = host.to_ascii_lowercase();
        if self.hosts.contains(&host) {
            return true;
        }
        self.subdomains_of
            .iter()
            .any(|parent| is_strict_subdomain(&host, parent))
    }

    /// Check whether an IP-literal host is allowed.
    pub fn is_ip_allowed(&self, ip: IpAddr) -> bool {
        self.ips.contains(&ip)
    }

    /// Allowed schemes, lowercase.
    pub fn schemes(&self) -> impl Iterator<Item = &str> {
        self.schemes.iter().map(String::as_str)
    }

    /// Exactly-allowed hostnames, lowercase.
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }

    /// Allowed IP-literal hosts.
    pub fn ips(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.ips.iter().copied()
    }

    /// True when nothing at all could be fetched.
    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
            || (self.hosts.is_empty() && self.ips.is_empty() && self.subdomains_of.is_empty())
    }
}

pub(crate) fn parse_ip_literal(host: &str) -> Option<IpAddr> {
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    host.parse().ok()
}

/// `host` is `<label>.<...>.parent`, with at least one extra label.
fn is_strict_subdomain(host: &str, parent: &str) -> bool {
    host.strip_suffix(parent)
        .and_then(|prefix| prefix.strip_suffix('.'))
        .is_some_and(|labels| !labels.is_empty() && !labels.ends_with('.'))
}
