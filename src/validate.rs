//! URL validation against the allow-list.

use crate::error::Error;
use crate::policy::AllowListPolicy;
use crate::safe_url::SafeUrl;

/// Result of successful URL validation.
#[derive(Debug, Clone)]
pub struct Validated {
    /// Normalized hostname the request will go to.
    pub host: String,

    /// Lowercase scheme.
    pub scheme: String,

    /// Full URL to fetch, userinfo removed.
    pub url: String,
}

/// Validate a URL against an allow-list policy.
///
/// This is the SSRF gate in front of every fetch. It:
/// 1. Parses the URL with a WHATWG parser ([`SafeUrl`])
/// 2. Checks the scheme against the policy
/// 3. Checks the parsed host against the policy: a domain against the allowed
///    names, an IP literal against the allowed addresses
///
/// Only the parser's host is compared. Raw URL text is never matched by
/// prefix, so `https://cdn.example.com@evil.net/` is judged as `evil.net`,
/// and `https:0x7f000001/` as `127.0.0.1`.
///
/// # Example
///
/// ```rust
/// use download_jail::{validate, PolicyBuilder};
///
/// let policy = PolicyBuilder::new()
///     .allow_scheme("https")
///     .allow_host("cdn.example.com")
///     .build();
///
/// assert!(validate("https://cdn.example.com/file.txt", &policy).is_ok());
/// assert!(validate("https://cdn.example.com@evil.net/file.txt", &policy).is_err());
/// ```
///
/// # Errors
///
/// - [`Error::UnparsableUrl`] if the URL is malformed or has no host
/// - [`Error::SchemeNotAllowed`] if the scheme is not allowed
/// - [`Error::HostNotAllowlisted`] if the hostname is not allowed
pub fn validate(url: &str, policy: &AllowListPolicy) -> Result<Validated, Error> {
    let safe_url = SafeUrl::parse(url)?;

    if !policy.is_scheme_allowed(safe_url.scheme()) {
        return Err(Error::scheme_not_allowed(url, safe_url.scheme()));
    }

    let host_allowed = match safe_url.ip() {
        Some(ip) => policy.is_ip_allowed(ip),
        None => policy.is_host_allowed(safe_url.host()),
    };
    if !host_allowed {
        return Err(Error::host_not_allowlisted(url, safe_url.host()));
    }

    if safe_url.has_credentials() {
        tracing::debug!(host = safe_url.host(), "stripped userinfo from allowed URL");
    }

    Ok(Validated {
        host: safe_url.host().to_string(),
        scheme: safe_url.scheme().to_string(),
        url: safe_url.as_str().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolicyBuilder;

    fn cdn_policy() -> AllowListPolicy {
        PolicyBuilder::new()
            .allow_scheme("https")
            .allow_host("cdn.example.com")
            .build()
    }

    #[test]
    fn test_allow_listed_url() {
        let v = validate("https://cdn.example.com/file.txt", &cdn_policy()).unwrap();
        assert_eq!(v.host, "cdn.example.com");
        assert_eq!(v.scheme, "https");
        assert_eq!(v.url, "https://cdn.example.com/file.txt");
    }

    #[test]
    fn test_mixed_case_is_allowed() {
        assert!(validate("HTTPS://CDN.EXAMPLE.COM/file.txt", &cdn_policy()).is_ok());
    }

    #[test]
    fn test_unparsable() {
        let err = validate("cdn.example.com/file.txt", &cdn_policy()).unwrap_err();
        assert!(matches!(err, Error::UnparsableUrl { .. }));
    }

    #[test]
    fn test_scheme_not_allowed() {
        for url in [
            "http://cdn.example.com/file.txt",
            "ftp://cdn.example.com/file.txt",
            "ws://cdn.example.com/file.txt",
        ] {
            let err = validate(url, &cdn_policy()).unwrap_err();
            assert!(matches!(err, Error::SchemeNotAllowed { .. }), "{url}");
        }
    }

    #[test]
    fn test_host_not_allowlisted() {
        for url in [
            "https://evil.com/x",
            "https://cdn.example.com.evil.com/x",
            "https://evil.com/cdn.example.com",
            "https://evil.com/?host=cdn.example.com",
            "https://sub.cdn.example.com/x",
            "https://127.0.0.1/x",
        ] {
            let err = validate(url, &cdn_policy()).unwrap_err();
            assert!(matches!(err, Error::HostNotAllowlisted { .. }), "{url}");
        }
    }

    // ==================== Embedded-credential bypass ====================

    #[test]
    fn test_userinfo_bypass_is_denied() {
        let err = validate(
            "https://cdn.example.com@302.r3dir.me/--to/?url=https://evil.com/favicon.ico",
            &cdn_policy(),
        )
        .unwrap_err();

        match err {
            Error::HostNotAllowlisted { host, .. } => assert_eq!(host, "302.r3dir.me"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_userinfo_with_password_bypass_is_denied() {
        assert!(validate("https://cdn.example.com:x@evil.com/", &cdn_policy()).is_err());
    }

    #[test]
    fn test_credentials_on_allowed_host_are_stripped() {
        let v = validate("https://u:p@cdn.example.com/file.txt", &cdn_policy()).unwrap();
        assert_eq!(v.url, "https://cdn.example.com/file.txt");
    }

    #[test]
    fn test_scheme_checked_before_host() {
        let err = validate("ftp://evil.com/", &cdn_policy()).unwrap_err();
        assert!(matches!(err, Error::SchemeNotAllowed { .. }));
    }

    #[test]
    fn test_subdomain_rule() {
        let policy = PolicyBuilder::new()
            .allow_scheme("https")
            .allow_subdomains_of("example.com")
            .build();
        assert!(validate("https://cdn.example.com/x", &policy).is_ok());
        assert!(validate("https://example.com/x", &policy).is_err());
        assert!(validate("https://example.com@evil.com/x", &policy).is_err());
    }

    #[test]
    fn test_repeated_validation_is_stable() {
        let policy = cdn_policy();
        for _ in 0..3 {
            assert!(validate("https://cdn.example.com/file.txt", &policy).is_ok());
            assert!(validate("https://evil.com/x", &policy).is_err());
        }
    }

    // ==================== IP literal hosts ====================

    #[test]
    fn test_hex_looking_hostnames_are_allowed() {
        let policy = PolicyBuilder::new()
            .allow_scheme("https")
            .allow_host("cafe")
            .allow_host("deadbeef")
            .allow_host("add")
            .allow_host("0xcafe.example.com")
            .build();

        for url in [
            "https://cafe/file.txt",
            "https://deadbeef/file.txt",
            "https://add/file.txt",
            "https://0xcafe.example.com/file.txt",
        ] {
            assert!(validate(url, &policy).is_ok(), "{url}");
        }
    }

    #[test]
    fn test_ip_spellings_are_judged_by_address() {
        for url in [
            "https:0x7f000001/",
            "https:\\\\0x7f000001/",
            "https:/0177.0.0.1/",
            "https://2130706433/",
            "https://127.1/",
            "https://cdn.example.com@0x7f000001/",
        ] {
            match validate(url, &cdn_policy()).unwrap_err() {
                Error::HostNotAllowlisted { host, .. } => assert_eq!(host, "127.0.0.1", "{url}"),
                other => panic!("unexpected error for {url}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_allow_listed_ip_matches_any_spelling() {
        let policy = PolicyBuilder::new()
            .allow_scheme("https")
            .allow_host("127.0.0.1")
            .build();

        for url in ["https://127.0.0.1/", "https:0x7f000001/", "https://0177.0.0.1/"] {
            let v = validate(url, &policy).unwrap();
            assert_eq!(v.host, "127.0.0.1");
            assert_eq!(v.url, "https://127.0.0.1/");
        }
        assert!(validate("https://127.0.0.2/", &policy).is_err());
    }

    #[test]
    fn test_ip_literal_not_matched_against_names() {
        // A name entry that happens to look like an address does not admit it
        let policy = PolicyBuilder::new()
            .allow_scheme("https")
            .allow_subdomains_of("0.0.1")
            .build();
        assert!(validate("https://127.0.0.1/", &policy).is_err());
    }
}
