//! Process configuration, loaded once at startup from TOML.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use crate::fetch::FetchConfig;
use crate::policy::AllowListPolicy;
use crate::policy_builder::PolicyBuilder;

/// Allow-list section (`[allow]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllowConfig {
    /// Permitted schemes, e.g. `["https"]`.
    pub schemes: Vec<String>,
    /// Exactly-permitted hostnames.
    pub hosts: Vec<String>,
    /// Parents whose strict subdomains are permitted.
    pub subdomains_of: Vec<String>,
}

impl Default for AllowConfig {
    fn default() -> Self {
        Self {
            schemes: vec!["https".to_string()],
            hosts: vec!["cdn.example.com".to_string()],
            subdomains_of: Vec::new(),
        }
    }
}

/// A DNS pin (`[[resolve]]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveEntry {
    /// Hostname as it appears in request URLs.
    pub host: String,
    /// Address connected to instead of resolving `host`.
    pub addr: SocketAddr,
}

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub listen: SocketAddr,
    /// Seconds to wait for upstream response headers.
    pub fetch_timeout_secs: u64,
    /// Seconds to wait for the upstream connection.
    pub connect_timeout_secs: u64,
    /// Seconds a single upstream read, body included, may stall.
    pub read_timeout_secs: u64,
    /// Stream upstream 4xx/5xx through instead of rejecting them.
    pub forward_error_status: bool,
    /// Overrides the default `User-Agent`.
    pub user_agent: Option<String>,
    /// What downloads may target.
    pub allow: AllowConfig,
    /// DNS pins for the outbound client.
    pub resolve: Vec<ResolveEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            fetch_timeout_secs: 5,
            connect_timeout_secs: 5,
            read_timeout_secs: 30,
            forward_error_status: false,
            user_agent: None,
            allow: AllowConfig::default(),
            resolve: Vec::new(),
        }
    }
}

impl Config {
    /// Read and check a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_toml_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Parse and check TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        ensure!(self.fetch_timeout_secs > 0, "fetch_timeout_secs must be > 0");
        ensure!(self.connect_timeout_secs > 0, "connect_timeout_secs must be > 0");
        ensure!(self.read_timeout_secs > 0, "read_timeout_secs must be > 0");
        Ok(())
    }

    /// Build the immutable allow-list.
    pub fn policy(&self) -> AllowListPolicy {
        let mut builder = PolicyBuilder::new();
        for scheme in &self.allow.schemes {
            builder = builder.allow_scheme(scheme);
        }
        for host in &self.allow.hosts {
            builder = builder.allow_host(host);
        }
        for parent in &self.allow.subdomains_of {
            builder = builder.allow_subdomains_of(parent);
        }
        builder.build()
    }

    /// Build the outbound client settings.
    pub fn fetch_config(&self) -> FetchConfig {
        let mut fetch = FetchConfig {
            timeout: Duration::from_secs(self.fetch_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            forward_error_status: self.forward_error_status,
            resolve: self
                .resolve
                .iter()
                .map(|entry| (entry.host.clone(), entry.addr))
                .collect(),
            ..FetchConfig::default()
        };
        if let Some(user_agent) = &self.user_agent {
            fetch.user_agent = user_agent.clone();
        }
        fetch
    }
}
