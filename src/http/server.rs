//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing)
//! - Resolve each request to an upstream
//! - Dispatch to the stream forwarder, the HTML transformer or the
//!   WebSocket tunnel
//! - Translate errors into status codes, at most once per request

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::client::{HttpsUpstream, UpstreamClient};
use crate::http::forward::StreamForwarder;
use crate::http::request::{is_upgrade_request, RequestIdExt, UuidRequestId};
use crate::http::websocket;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::rewrite::ResponseTransformer;
use crate::routing::{RoutingDecision, TargetResolver};

/// Application state injected into handlers. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub resolver: Arc<TargetResolver>,
    pub forwarder: StreamForwarder,
    pub transformer: Arc<ResponseTransformer>,
}

/// How a request was served, used as a metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProxyMode {
    Stream,
    Rewrite,
    Upgrade,
}

impl ProxyMode {
    fn as_str(self) -> &'static str {
        match self {
            ProxyMode::Stream => "stream",
            ProxyMode::Rewrite => "rewrite",
            ProxyMode::Upgrade => "upgrade",
        }
    }
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a server that reaches upstreams over the network.
    pub fn new(config: ProxyConfig) -> Self {
        let upstream = Arc::new(HttpsUpstream::new(&config.timeouts));
        Self::with_upstream(config, upstream)
    }

    /// Create a server using the given upstream client.
    pub fn with_upstream(config: ProxyConfig, upstream: Arc<dyn UpstreamClient>) -> Self {
        let config = Arc::new(config);
        let state = AppState {
            resolver: Arc::new(TargetResolver::new(config.default_target_url.clone())),
            forwarder: StreamForwarder::new(
                upstream,
                Duration::from_secs(config.timeouts.response_secs),
            ),
            transformer: Arc::new(ResponseTransformer::new(
                config.public_hostname.clone(),
                &config.limits,
            )),
            config: config.clone(),
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http().make_span_with(
                        |request: &Request<Body>| {
                            tracing::info_span!(
                                "request",
                                request_id = %request.request_id(),
                                method = %request.method(),
                                uri = %request.uri(),
                            )
                        },
                    ))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            default_target = %self.config.default_target_url,
            public_hostname = %self.config.public_hostname,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.recv().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Resolves the target, forwards the request and picks how to answer.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request.request_id().to_string();
    let method = request.method().clone();
    let upgrade = is_upgrade_request(&request);
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let outcome = match state.resolver.resolve(&path, upgrade) {
        Ok(decision) => {
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                target = %decision,
                upgrade,
                "Proxying request"
            );
            if upgrade {
                websocket::tunnel(&state.forwarder, &decision, request, &request_id)
                    .await
                    .map(|response| (ProxyMode::Upgrade, response))
            } else {
                dispatch(&state, &decision, request, &request_id).await
            }
        }
        Err(err) => Err(ProxyError::from(err)),
    };

    match outcome {
        Ok((mode, response)) => {
            metrics::record_request(
                method.as_str(),
                response.status().as_u16(),
                mode.as_str(),
                start_time,
            );
            response
        }
        Err(err) => {
            let status = err.status_code();
            if status.is_server_error() {
                tracing::error!(
                    request_id = %request_id,
                    path = %path,
                    error = %err,
                    "Proxy error"
                );
            } else {
                tracing::warn!(
                    request_id = %request_id,
                    path = %path,
                    error = %err,
                    "Rejected request"
                );
            }
            metrics::record_request(method.as_str(), status.as_u16(), "error", start_time);
            err.into_response()
        }
    }
}

/// Forward a plain request and choose between streaming and rewriting.
async fn dispatch(
    state: &AppState,
    decision: &RoutingDecision,
    request: Request<Body>,
    request_id: &str,
) -> Result<(ProxyMode, Response<Body>), ProxyError> {
    let method = request.method().clone();
    let response = state.forwarder.send(request, decision).await?;

    if state
        .transformer
        .wants(&method, response.status(), response.headers())
    {
        let (parts, body) = response.into_parts();
        let response = Response::from_parts(parts, Body::new(body));
        let rewritten = state.transformer.transform(response, decision).await?;
        return Ok((ProxyMode::Rewrite, rewritten));
    }

    Ok((ProxyMode::Stream, StreamForwarder::relay(response, request_id)))
}
