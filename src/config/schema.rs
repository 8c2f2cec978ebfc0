//! Configuration schema definitions.
//!
//! `ProxyConfig` is assembled once at startup from the environment (or the
//! equivalent CLI flags) plus an optional TOML settings file, then shared
//! read-only with every request task.

use serde::Deserialize;
use url::Url;

/// Port used when `PORT` is not set.
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Root configuration for the proxy.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// TCP port to listen on (all interfaces).
    pub listen_port: u16,

    /// Upstream used when the request path does not name a host.
    pub default_target_url: Url,

    /// Hostname clients use to reach this proxy; embedded in injected scripts.
    pub public_hostname: String,

    /// Upstream deadlines.
    pub timeouts: TimeoutConfig,

    /// Buffering limits for rewritten responses.
    pub limits: LimitsConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

impl ProxyConfig {
    /// Build a configuration with default settings and the public hostname
    /// derived from the listen port.
    pub fn new(listen_port: u16, default_target_url: Url) -> Self {
        Self::with_settings(listen_port, default_target_url, None, Settings::default())
    }

    /// Build a configuration from its parts. Without an external hostname the
    /// proxy advertises itself as `localhost:{port}`.
    pub fn with_settings(
        listen_port: u16,
        default_target_url: Url,
        public_hostname: Option<String>,
        settings: Settings,
    ) -> Self {
        let public_hostname =
            public_hostname.unwrap_or_else(|| format!("localhost:{}", listen_port));
        Self {
            listen_port,
            default_target_url,
            public_hostname,
            timeouts: settings.timeouts,
            limits: settings.limits,
            observability: settings.observability,
        }
    }

    /// Address the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.listen_port)
    }
}

/// Tunables read from the optional settings file. Every field has a default,
/// so an empty file is valid.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub timeouts: TimeoutConfig,
    pub limits: LimitsConfig,
    pub observability: ObservabilityConfig,
}

/// Timeout configuration for upstream traffic.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream TCP connect timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for the upstream to send response headers, in seconds.
    pub response_secs: u64,

    /// Idle pooled upstream connections are closed after this many seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            response_secs: 30,
            idle_secs: 90,
        }
    }
}

/// Limits applied while buffering HTML bodies.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest upstream HTML body (as received, before decompression) that
    /// will be buffered for rewriting.
    pub max_html_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_html_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default tracing filter, used when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "rewrite_proxy=info,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
