//! The `/download` endpoint.
//!
//! `Start → FieldsChecked → Validated → Fetched → Responded`, short-circuiting
//! to a rejection at any gate. Every rejection is the same 400 response; the
//! specific reason only goes to the operator log.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::TryStreamExt;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;

use crate::error::Error;
use crate::fetch::{Fetched, Fetcher};
use crate::policy::AllowListPolicy;
use crate::validate::validate;

/// Bytes left unescaped by JavaScript's `encodeURIComponent`.
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Read-only state shared by all requests.
#[derive(Debug)]
pub struct AppState {
    /// Allow-list every `url` is validated against before any fetch.
    pub policy: AllowListPolicy,

    /// Outbound client used for URLs that passed validation.
    pub fetcher: Fetcher,
}

impl AppState {
    /// Bundle a policy and a fetcher; wrap the result in an [`Arc`] for
    /// [`router`].
    pub fn new(policy: AllowListPolicy, fetcher: Fetcher) -> Self {
        Self { policy, fetcher }
    }
}

/// Query parameters of `GET /download`.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadParams {
    /// Absolute URL to download. Absent or empty is rejected.
    pub url: Option<String>,

    /// Name offered to the client in `Content-Disposition`. Absent or empty
    /// is rejected.
    pub file_name: Option<String>,
}

/// Build the router: `GET /download` and `GET /healthz`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/download", get(handle_download))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Validate, fetch and stream a download, or reject it.
///
/// A malformed query string is treated like missing parameters.
pub async fn handle_download(
    State(state): State<Arc<AppState>>,
    query: Result<Query<DownloadParams>, QueryRejection>,
) -> Response {
    let params = query.map(|Query(params)| params).unwrap_or_default();

    match download(&state, &params).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(
                url = params.url.as_deref().unwrap_or_default(),
                file_name = params.file_name.as_deref().unwrap_or_default(),
                reason = err.reason(),
                error = %err,
                "blocked or failed download"
            );
            err.into_response()
        }
    }
}

async fn download(state: &AppState, params: &DownloadParams) -> Result<Response, Error> {
    let url = required(params.url.as_deref(), "url")?;
    let file_name = required(params.file_name.as_deref(), "file_name")?;

    let validated = validate(url, &state.policy)?;
    tracing::debug!(host = %validated.host, file_name, "download allowed");

    let fetched = state.fetcher.fetch(&validated).await?;
    Ok(attachment_response(fetched, file_name, validated.url))
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, Error> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::missing_field(field))
}

fn attachment_response(fetched: Fetched, file_name: &str, url: String) -> Response {
    let status = fetched.status;
    let content_type = fetched.content_type.clone();
    let content_length = fetched.content_length;

    // Polled only as fast as the client reads
    let body = fetched.into_body_stream().inspect_err(move |e| {
        tracing::warn!(url = %url, error = %e, "upstream body failed mid-stream");
    });

    let mut response = Body::from_stream(body).into_response();
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(CONTENT_DISPOSITION, content_disposition(file_name));
    if let Some(len) = content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    }

    response
}

/// `attachment; filename="<percent-encoded name>"`.
///
/// Encoding leaves only `A-Za-z0-9-_.!~*'()` and `%`, so quotes, `;`, CR and
/// LF cannot reach the header.
pub fn content_disposition(file_name: &str) -> HeaderValue {
    let encoded = utf8_percent_encode(file_name, FILENAME_ENCODE_SET);
    HeaderValue::from_str(&format!("attachment; filename=\"{encoded}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
