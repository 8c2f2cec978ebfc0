//! Target resolution.
//!
//! # Responsibilities
//! - Turn a request path into a `RoutingDecision`
//! - Pick `https`/`wss` for path-encoded hosts
//! - Fall back to the configured default target otherwise
//!
//! # Design Decisions
//! - Pure and immutable after construction (thread-safe without locks)
//! - A path that is not a recognizable host degrades to the default target
//! - Only a host that cannot form a URL is an error

use std::fmt;

use axum::http::Uri;
use thiserror::Error;
use url::Url;

use crate::routing::matcher::match_host_segment;

/// Error produced when a path names a host that cannot be turned into a URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("`{0}` is not a valid upstream host")]
    InvalidHost(String),

    #[error("cannot build upstream URI `{0}`")]
    InvalidUri(String),
}

/// Where a single request goes. Computed once per request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    target_url: Url,
    rewritten_path: String,
    target_hostname: String,
}

impl RoutingDecision {
    /// Base URL of the upstream: scheme, host, optional port and base path.
    pub fn target_url(&self) -> &Url {
        &self.target_url
    }

    /// Path (and query) to request from the upstream, relative to the base.
    pub fn rewritten_path(&self) -> &str {
        &self.rewritten_path
    }

    /// Bare hostname of the upstream.
    pub fn target_hostname(&self) -> &str {
        &self.target_hostname
    }

    /// `host[:port]`, used as the upstream `Host` header.
    pub fn authority(&self) -> String {
        match self.target_url.port() {
            Some(port) => format!("{}:{}", self.target_hostname, port),
            None => self.target_hostname.clone(),
        }
    }

    /// Absolute URI for the HTTP client. WebSocket schemes are mapped back to
    /// their HTTP equivalents since the upgrade starts as an HTTP/1.1 request.
    pub fn upstream_uri(&self) -> Result<Uri, RoutingError> {
        let scheme = match self.target_url.scheme() {
            "wss" => "https",
            "ws" => "http",
            other => other,
        };
        let base_path = self.target_url.path().trim_end_matches('/');
        let uri = format!(
            "{}://{}{}{}",
            scheme,
            self.authority(),
            base_path,
            self.rewritten_path
        );
        uri.parse::<Uri>().map_err(|_| RoutingError::InvalidUri(uri))
    }
}

impl fmt::Display for RoutingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}{}{}",
            self.target_url.scheme(),
            self.authority(),
            self.target_url.path().trim_end_matches('/'),
            self.rewritten_path
        )
    }
}

/// Maps request paths to upstream targets.
#[derive(Debug, Clone)]
pub struct TargetResolver {
    default_target: Url,
}

impl TargetResolver {
    /// Create a resolver falling back to `default_target`.
    pub fn new(default_target: Url) -> Self {
        Self { default_target }
    }

    /// Resolve `path` (path plus optional query, starting with `/`).
    ///
    /// `upgrade` selects WebSocket schemes for the decision.
    pub fn resolve(&self, path: &str, upgrade: bool) -> Result<RoutingDecision, RoutingError> {
        if let Some(segment) = match_host_segment(path) {
            let scheme = if upgrade { "wss" } else { "https" };
            let target_url = Url::parse(&format!("{}://{}/", scheme, segment.host))
                .ok()
                .filter(|url| url.host_str().is_some())
                .ok_or_else(|| RoutingError::InvalidHost(segment.host.to_string()))?;

            return Ok(RoutingDecision {
                target_url,
                rewritten_path: segment.rest.to_string(),
                target_hostname: segment.host.to_string(),
            });
        }

        let mut target_url = self.default_target.clone();
        if upgrade {
            let ws_scheme = if target_url.scheme() == "http" { "ws" } else { "wss" };
            // http(s) -> ws(s) is always accepted between special schemes.
            let _ = target_url.set_scheme(ws_scheme);
        }
        let target_hostname = target_url.host_str().unwrap_or_default().to_string();

        Ok(RoutingDecision {
            target_url,
            rewritten_path: path.to_string(),
            target_hostname,
        })
    }
}
