//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Forward the upgrade handshake to the resolved upstream
//! - Return the upstream's `101 Switching Protocols` to the client
//! - Tunnel bytes between both upgraded connections
//!
//! # Data Flow
//! ```text
//! Client ←── upgraded bytes ──→ Proxy ←── upgraded bytes ──→ Upstream
//! ```
//!
//! # Design Decisions
//! - Byte-level tunnel, frames are never parsed or buffered
//! - A non-101 upstream answer is relayed like any other response
//! - Either side closing ends the tunnel for both

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::io::copy_bidirectional;

use crate::error::ProxyError;
use crate::http::forward::StreamForwarder;
use crate::routing::RoutingDecision;

/// Proxy an upgrade request and spawn the tunnel once both sides switch.
pub async fn tunnel(
    forwarder: &StreamForwarder,
    decision: &RoutingDecision,
    mut request: Request<Body>,
    request_id: &str,
) -> Result<Response<Body>, ProxyError> {
    let client_upgrade = hyper::upgrade::on(&mut request);
    let mut upstream_response = forwarder.send(request, decision).await?;

    if upstream_response.status() != StatusCode::SWITCHING_PROTOCOLS {
        tracing::debug!(
            request_id = %request_id,
            status = %upstream_response.status(),
            "Upstream declined upgrade"
        );
        return Ok(StreamForwarder::relay(upstream_response, request_id));
    }

    let upstream_upgrade = hyper::upgrade::on(&mut upstream_response);
    let request_id = request_id.to_string();
    let target = decision.to_string();

    tokio::spawn(async move {
        match tokio::try_join!(client_upgrade, upstream_upgrade) {
            Ok((client, upstream)) => {
                let mut client = TokioIo::new(client);
                let mut upstream = TokioIo::new(upstream);
                match copy_bidirectional(&mut client, &mut upstream).await {
                    Ok((to_upstream, to_client)) => tracing::debug!(
                        request_id = %request_id,
                        target = %target,
                        to_upstream,
                        to_client,
                        "WebSocket tunnel closed"
                    ),
                    Err(err) => tracing::debug!(
                        request_id = %request_id,
                        target = %target,
                        error = %err,
                        "WebSocket tunnel aborted"
                    ),
                }
            }
            Err(err) => tracing::warn!(
                request_id = %request_id,
                error = %err,
                "WebSocket upgrade failed"
            ),
        }
    });

    let (parts, _) = upstream_response.into_parts();
    Ok(Response::from_parts(parts, Body::empty()))
}
