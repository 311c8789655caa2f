//! Outbound HTTP fetching with redirects disabled.
//!
//! A 3xx from upstream is reported as [`Error::RedirectAttempted`] and never
//! followed: the target of a redirect is chosen by whoever controls the
//! upstream response, so only the URL that passed validation is ever
//! contacted.

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderValue, StatusCode};
use futures_util::Stream;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy as RedirectPolicy;
use reqwest::{Client, Response};

use crate::error::Error;
use crate::validate::Validated;

/// Content type used when upstream does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Settings for the outbound client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Deadline for sending the request and receiving response headers.
    pub timeout: Duration,

    /// Deadline for establishing the TCP/TLS connection.
    pub connect_timeout: Duration,

    /// Longest wait for any single read from upstream, body included. A body
    /// that stalls for this long ends the download with an error.
    pub read_timeout: Duration,

    /// `User-Agent` sent upstream.
    pub user_agent: String,

    /// Pass 4xx/5xx upstream responses through instead of rejecting them.
    pub forward_error_status: bool,

    /// DNS pins: requests for `host` connect to `addr` instead of resolving.
    pub resolve: Vec<(String, SocketAddr)>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(30),
            user_agent: concat!("download-jail/", env!("CARGO_PKG_VERSION")).to_string(),
            forward_error_status: false,
            resolve: Vec::new(),
        }
    }
}

/// An upstream response that may be streamed to the caller.
#[derive(Debug)]
pub struct Fetched {
    /// Upstream status. Never a redirect.
    pub status: StatusCode,

    /// Upstream `Content-Type`, or [`DEFAULT_CONTENT_TYPE`].
    pub content_type: HeaderValue,

    /// Upstream `Content-Length`, if declared.
    pub content_length: Option<u64>,

    response: Response,
}

impl Fetched {
    /// The body as a lazy stream of chunks, read from the network on demand.
    ///
    /// Dropping the stream drops the upstream connection.
    pub fn into_body_stream(self) -> impl Stream<Item = reqwest::Result<Bytes>> {
        self.response.bytes_stream()
    }
}

/// Fetches validated URLs.
///
/// Holds one connection-pooling client; clone freely.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    timeout: Duration,
    forward_error_status: bool,
}

impl Fetcher {
    /// Build the outbound client.
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        // Direct connections only: DNS pins do not apply through a proxy
        let mut builder = Client::builder()
            .no_proxy()
            .redirect(RedirectPolicy::none())
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .user_agent(config.user_agent.as_str());

        for (host, addr) in &config.resolve {
            builder = builder.resolve(host, *addr);
        }

        Ok(Self {
            client: builder.build()?,
            timeout: config.timeout,
            forward_error_status: config.forward_error_status,
        })
    }

    /// Fetch a validated URL.
    ///
    /// Waits at most the configured timeout for response headers. The body is
    /// left unread in the returned [`Fetched`].
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if headers do not arrive in time
    /// - [`Error::Connection`] on DNS, connect, TLS or protocol failure
    /// - [`Error::RedirectAttempted`] on any 3xx
    /// - [`Error::NonSuccessStatus`] on 4xx/5xx unless forwarding is enabled
    pub async fn fetch(&self, validated: &Validated) -> Result<Fetched, Error> {
        let url = validated.url.as_str();

        // Dropping the pending future on timeout abandons the connection
        let response = match tokio::time::timeout(self.timeout, self.client.get(url).send()).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(classify_request_error(url, e)),
            Err(_) => {
                return Err(Error::Timeout {
                    url: url.to_string(),
                })
            }
        };

        let status = response.status();
        tracing::debug!(url, status = status.as_u16(), "upstream responded");

        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .map(|h| String::from_utf8_lossy(h.as_bytes()).into_owned());
            return Err(Error::RedirectAttempted {
                url: url.to_string(),
                location,
            });
        }

        if !status.is_success() && !(self.forward_error_status && is_error_status(status)) {
            return Err(Error::NonSuccessStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

        Ok(Fetched {
            status,
            content_type,
            content_length: response.content_length(),
            response,
        })
    }
}

fn is_error_status(status: StatusCode) -> bool {
    status.is_client_error() || status.is_server_error()
}

fn classify_request_error(url: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout {
            url: url.to_string(),
        }
    } else {
        Error::connection(url, e.to_string())
    }
}
