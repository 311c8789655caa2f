//! # download_jail
//!
//! An SSRF-safe download proxy.
//!
//! `download_jail` accepts `GET /download?url=...&file_name=...`, checks the
//! URL against an allow-list of schemes and hostnames, fetches it with
//! redirects disabled, and streams the body back as an attachment.
//!
//! The allow-list decision is made on the hostname produced by a WHATWG URL
//! parser, never on the raw URL text. `https://cdn.example.com@evil.net/`
//! is a request to `evil.net` and is refused. IP-literal hosts are judged by
//! the parsed address: `https:0x7f000001/` is `127.0.0.1`, allowed only if
//! that address is listed. Upstream redirects are refused outright rather
//! than followed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use download_jail::{router, AppState, FetchConfig, Fetcher, PolicyBuilder};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let policy = PolicyBuilder::new()
//!     .allow_scheme("https")
//!     .allow_host("cdn.example.com")
//!     .build();
//! let fetcher = Fetcher::new(&FetchConfig::default())?;
//!
//! let app = router(Arc::new(AppState::new(policy, fetcher)));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod fetch;
mod handler;
mod policy;
mod policy_builder;
mod safe_url;
mod validate;

pub mod logging;

pub use config::{AllowConfig, Config, ResolveEntry};
pub use error::{Error, ErrorClass, REJECTION_MESSAGE};
pub use fetch::{FetchConfig, Fetched, Fetcher, DEFAULT_CONTENT_TYPE};
pub use handler::{content_disposition, handle_download, router, AppState, DownloadParams};
pub use policy::AllowListPolicy;
pub use policy_builder::PolicyBuilder;
pub use safe_url::SafeUrl;
pub use validate::{validate, Validated};
