//! Path-routed reverse proxy with HTML link rewriting.
//!
//! `/{hostname}/{path}` is proxied to `https://{hostname}/{path}`; anything
//! else goes to the configured default target. HTML responses get a small
//! script spliced in before `</head>` that points root-relative links back
//! through the proxy. Everything else, WebSockets included, is streamed.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod rewrite;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
