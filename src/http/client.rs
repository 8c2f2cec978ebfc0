//! Upstream HTTP client.
//!
//! # Responsibilities
//! - Open (pooled) connections to upstream hosts over http or https
//! - Apply the connect and idle timeouts
//! - Keep responses upgradeable for WebSocket tunnelling
//!
//! # Design Decisions
//! - HTTP/1.1 only towards upstreams so `Upgrade` requests keep working
//! - Certificates are verified against the webpki root set
//! - The client sits behind a trait so the transport can be swapped

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client, Error as ClientError};
use hyper_util::rt::TokioExecutor;

use crate::config::TimeoutConfig;

/// Outcome of a single upstream exchange (response headers received).
pub type UpstreamResult = Result<Response<Incoming>, ClientError>;

/// Sends fully-formed upstream requests (absolute URI, rewritten `Host`).
pub trait UpstreamClient: Send + Sync + 'static {
    fn send(&self, request: Request<Body>) -> BoxFuture<'static, UpstreamResult>;
}

/// Production client: hyper-util connection pool over rustls.
#[derive(Clone)]
pub struct HttpsUpstream {
    client: Client<HttpsConnector<HttpConnector>, Body>,
}

impl HttpsUpstream {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_nodelay(true);
        http.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

        let https = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
            .build(https);

        Self { client }
    }
}

impl UpstreamClient for HttpsUpstream {
    fn send(&self, request: Request<Body>) -> BoxFuture<'static, UpstreamResult> {
        Box::pin(self.client.request(request))
    }
}
