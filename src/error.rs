//! Error types for download_jail.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// The only body a caller ever sees when a download is refused.
///
/// Every rejection shares it so the response does not reveal which rule
/// tripped.
pub const REJECTION_MESSAGE: &str = "Invalid or forbidden URL";

/// Coarse classification of [`Error`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A required request field was absent.
    Input,
    /// The URL was refused by the allow-list policy.
    Validation,
    /// The outbound retrieval failed or was refused.
    Fetch,
}

/// Errors that can occur while validating or fetching a download.
#[derive(Debug, Error)]
pub enum Error {
    /// A required query parameter was missing or empty.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    /// The URL could not be parsed or has no host.
    #[error("Invalid URL: {reason}")]
    UnparsableUrl { url: String, reason: String },

    /// The URL scheme is not in the allow-list.
    #[error("Scheme not allowed: {scheme}")]
    SchemeNotAllowed { url: String, scheme: String },

    /// The parsed hostname is not in the allow-list.
    #[error("Blocked hostname: {host}")]
    HostNotAllowlisted { url: String, host: String },

    /// Upstream did not answer within the fetch timeout.
    #[error("Upstream timed out")]
    Timeout { url: String },

    /// DNS, connect, TLS or transport failure.
    #[error("Connection error: {message}")]
    Connection { url: String, message: String },

    /// Upstream answered with a 3xx. Never followed.
    #[error("Redirect blocked: {}", .location.as_deref().unwrap_or("<no location>"))]
    RedirectAttempted {
        url: String,
        location: Option<String>,
    },

    /// Upstream answered with a non-success status.
    #[error("Upstream status {status}")]
    NonSuccessStatus { url: String, status: u16 },
}

impl Error {
    pub(crate) fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    pub(crate) fn unparsable_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnparsableUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn scheme_not_allowed(url: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self::SchemeNotAllowed {
            url: url.into(),
            scheme: scheme.into(),
        }
    }

    pub(crate) fn host_not_allowlisted(url: impl Into<String>, host: impl Into<String>) -> Self {
        Self::HostNotAllowlisted {
            url: url.into(),
            host: host.into(),
        }
    }

    pub(crate) fn connection(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Which stage of the pipeline produced this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MissingField { .. } => ErrorClass::Input,
            Self::UnparsableUrl { .. }
            | Self::SchemeNotAllowed { .. }
            | Self::HostNotAllowlisted { .. } => ErrorClass::Validation,
            Self::Timeout { .. }
            | Self::Connection { .. }
            | Self::RedirectAttempted { .. }
            | Self::NonSuccessStatus { .. } => ErrorClass::Fetch,
        }
    }

    /// Stable reason code for operator logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "missing_field",
            Self::UnparsableUrl { .. } => "unparsable_url",
            Self::SchemeNotAllowed { .. } => "scheme_not_allowed",
            Self::HostNotAllowlisted { .. } => "host_not_allowlisted",
            Self::Timeout { .. } => "timeout",
            Self::Connection { .. } => "connection_error",
            Self::RedirectAttempted { .. } => "redirect_attempted",
            Self::NonSuccessStatus { .. } => "non_success_status",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            REJECTION_MESSAGE,
        )
            .into_response()
    }
}
