//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use futures_util::future::BoxFuture;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::net::TcpListener;
use url::Url;

use rewrite_proxy::config::{ProxyConfig, Settings};
use rewrite_proxy::http::{HttpServer, UpstreamClient, UpstreamResult};
use rewrite_proxy::lifecycle::Shutdown;

/// Public hostname the test proxies advertise in injected scripts.
pub const PUBLIC_HOSTNAME: &str = "proxy.test";

/// Start a mock backend serving `app` on an ephemeral port.
pub async fn start_backend(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Configuration pointing the default target at `target`.
pub fn proxy_config(target: &str, settings: Settings) -> ProxyConfig {
    ProxyConfig::with_settings(
        8080,
        Url::parse(target).unwrap(),
        Some(PUBLIC_HOSTNAME.to_string()),
        settings,
    )
}

/// A running proxy. Dropping it stops the server.
pub struct TestProxy {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a proxy with the network upstream client.
pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    serve(HttpServer::new(config)).await
}

/// Start a proxy whose upstream connections all land on `backend`,
/// whatever host the request was resolved to.
pub async fn start_proxy_via(config: ProxyConfig, backend: SocketAddr) -> TestProxy {
    serve(HttpServer::with_upstream(config, Arc::new(LoopbackUpstream::new(backend)))).await
}

async fn serve(server: HttpServer) -> TestProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });
    TestProxy { addr, shutdown }
}

/// Upstream client that keeps the resolved `Host` header but connects to a
/// local backend over plain HTTP.
pub struct LoopbackUpstream {
    backend: SocketAddr,
    client: Client<HttpConnector, Body>,
}

impl LoopbackUpstream {
    pub fn new(backend: SocketAddr) -> Self {
        Self {
            backend,
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
        }
    }
}

impl UpstreamClient for LoopbackUpstream {
    fn send(&self, mut request: Request<Body>) -> BoxFuture<'static, UpstreamResult> {
        let path = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        *request.uri_mut() = format!("http://{}{}", self.backend, path).parse().unwrap();
        Box::pin(self.client.request(request))
    }
}

/// HTTP client that neither pools connections nor decodes bodies.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}
