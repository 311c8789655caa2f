//! Strict URL parsing and hostname normalization.

use std::net::IpAddr;

use url::{Host, Url};

use crate::Error;

/// A parsed URL whose hostname can be trusted for allow-list decisions.
///
/// The hostname is taken from the WHATWG parser, so a URL such as
/// `https://cdn.example.com@evil.net/` yields `evil.net`: everything before
/// the `@` is userinfo and has no bearing on where the request goes.
///
/// IP literals are canonicalized by the parser, whatever their spelling:
/// `0x7f000001`, `0177.0.0.1`, `2130706433` and `127.1` all come out as
/// `127.0.0.1` and are reported through [`ip`](Self::ip).
#[derive(Debug, Clone)]
pub struct SafeUrl {
    inner: Url,
    host: String,
    ip: Option<IpAddr>,
    had_credentials: bool,
}

impl SafeUrl {
    /// Parse and normalize a URL string.
    ///
    /// This performs:
    /// - Full WHATWG parsing (scheme, userinfo, host, port, path)
    /// - Hostname normalization (lowercase, no trailing dot)
    /// - Removal of userinfo (user:pass@), remembered in [`has_credentials`](Self::has_credentials)
    ///
    /// The scheme is not checked here; that is a policy decision.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnparsableUrl`] if the URL is malformed or has no host.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let mut url = Url::parse(input).map_err(|e| Error::unparsable_url(input, e.to_string()))?;

        let (host, ip) = match url.host() {
            None => return Err(Error::unparsable_url(input, "URL must have a host")),
            Some(Host::Domain(domain)) => (normalize_domain(domain, input)?, None),
            Some(Host::Ipv4(v4)) => (v4.to_string(), Some(IpAddr::V4(v4))),
            Some(Host::Ipv6(v6)) => (format!("[{v6}]"), Some(IpAddr::V6(v6))),
        };

        let had_credentials = !url.username().is_empty() || url.password().is_some();
        if had_credentials {
            url.set_username("")
                .and_then(|()| url.set_password(None))
                .map_err(|()| Error::unparsable_url(input, "cannot strip userinfo"))?;
        }

        Ok(Self {
            inner: url,
            host,
            ip,
            had_credentials,
        })
    }

    /// Get the lowercase scheme.
    pub fn scheme(&self) -> &str {
        self.inner.scheme()
    }

    /// Get the normalized hostname. IPv6 literals keep their brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The address, when the host is an IP literal rather than a domain.
    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    /// Get the port, defaulting to the scheme's well-known port.
    pub fn port(&self) -> Option<u16> {
        self.inner.port_or_known_default()
    }

    /// Get the path.
    pub fn path(&self) -> &str {
        self.inner.path()
    }

    /// Whether the raw authority carried `user[:pass]@`.
    pub fn has_credentials(&self) -> bool {
        self.had_credentials
    }

    /// Get the full URL, with any userinfo removed.
    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }

    /// Get the underlying URL.
    pub fn into_url(self) -> Url {
        self.inner
    }
}

/// Lowercase a parsed domain and drop the FQDN trailing dot.
fn normalize_domain(domain: &str, original_url: &str) -> Result<String, Error> {
    let normalized = domain.trim_end_matches('.').to_lowercase();

    if normalized.is_empty() {
        return Err(Error::unparsable_url(original_url, "empty hostname"));
    }

    Ok(normalized)
}
