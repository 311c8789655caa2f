//! Builder for the download allow-list.
//!
//! ## Immutability
//!
//! Once built via [`PolicyBuilder::build()`], an [`AllowListPolicy`] cannot be
//! modified. The builder consumes `self` on each method call, preventing
//! accidental reuse.
//!
//! ## Security Considerations
//!
//! **Be careful with [`PolicyBuilder::allow_subdomains_of`].** Every host
//! under the parent becomes fetchable, including ones you do not operate:
//!
//! ```rust
//! use download_jail::PolicyBuilder;
//!
//! // DANGEROUS: any bucket on the shared domain can now be downloaded.
//! let bad_policy = PolicyBuilder::new()
//!     .allow_scheme("https")
//!     .allow_subdomains_of("s3.amazonaws.com")
//!     .build();
//! # assert!(bad_policy.is_host_allowed("attacker-bucket.s3.amazonaws.com"));
//! ```

use url::Host;

use crate::policy::{parse_ip_literal, AllowListPolicy};

/// Builder for [`AllowListPolicy`].
///
/// Entries are trimmed, lowercased and stripped of a trailing dot so they
/// compare equal to hostnames produced by [`SafeUrl`](crate::SafeUrl).
/// Empty entries are silently ignored.
#[derive(Debug, Clone, Default)]
pub struct PolicyBuilder {
    policy: AllowListPolicy,
}

impl PolicyBuilder {
    /// Create an empty builder. An empty policy denies everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow a URL scheme, e.g. `"https"`. A trailing `:` is accepted.
    pub fn allow_scheme(mut self, scheme: &str) -> Self {
        let scheme = scheme.trim().trim_end_matches(':').to_ascii_lowercase();
        if !scheme.is_empty() {
            self.policy.schemes.insert(scheme);
        }
        self
    }

    /// Allow exactly one hostname or IP address.
    ///
    /// IP entries are canonicalized the way a URL parser would, so
    /// `"0x7f000001"` and `"127.0.0.1"` name the same address. IPv6 entries
    /// may be given with or without brackets.
    pub fn allow_host(mut self, host: &str) -> Self {
        let Some(host) = normalize_entry(host) else {
            return self;
        };
        if let Some(ip) = parse_ip_literal(&host) {
            self.policy.ips.insert(ip);
            return self;
        }
        match Host::parse(&host) {
            Ok(Host::Ipv4(v4)) => {
                self.policy.ips.insert(v4.into());
            }
            _ => {
                self.policy.hosts.insert(host);
            }
        }
        self
    }

    /// Allow every strict subdomain of `parent`.
    ///
    /// `"example.com"` and `"*.example.com"` are equivalent. The parent
    /// itself is not allowed unless also passed to [`allow_host`](Self::allow_host).
    pub fn allow_subdomains_of(mut self, parent: &str) -> Self {
        let parent = parent.trim();
        let parent = parent.strip_prefix("*.").unwrap_or(parent);
        if let Some(parent) = normalize_entry(parent) {
            self.policy.subdomains_of.insert(parent);
        }
        self
    }

    /// Build the policy.
    pub fn build(self) -> AllowListPolicy {
        self.policy
    }
}

fn normalize_entry(entry: &str) -> Option<String> {
    let entry = entry.trim().trim_end_matches('.').to_ascii_lowercase();
    (!entry.is_empty()).then_some(entry)
}
