//! Unbuffered forwarding between client and upstream.
//!
//! # Responsibilities
//! - Send the rewritten request to the upstream under a deadline
//! - Relay the upstream response without buffering the body
//! - Report failures that happen after headers were flushed
//!
//! # Design Decisions
//! - Errors before the response head is returned become 502/504
//! - Errors mid-body abort the client connection; there is no retry
//! - Dropping the relayed body (client gone) drops the upstream connection
//! - Hop-by-hop response headers are dropped, except on `101` answers

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;

use crate::error::ProxyError;
use crate::http::client::UpstreamClient;
use crate::http::request::into_upstream_request;
use crate::http::response::strip_hop_by_hop;
use crate::resilience::timeouts::upstream_deadline;
use crate::routing::RoutingDecision;

/// Opens upstream exchanges and relays their responses.
#[derive(Clone)]
pub struct StreamForwarder {
    upstream: Arc<dyn UpstreamClient>,
    response_timeout: Duration,
}

impl StreamForwarder {
    pub fn new(upstream: Arc<dyn UpstreamClient>, response_timeout: Duration) -> Self {
        Self {
            upstream,
            response_timeout,
        }
    }

    /// Forward `request` to the upstream chosen by `decision` and wait for
    /// the response head.
    pub async fn send(
        &self,
        request: Request<Body>,
        decision: &RoutingDecision,
    ) -> Result<Response<Incoming>, ProxyError> {
        let upstream_request = into_upstream_request(request, decision)?;
        let mut response =
            upstream_deadline(self.response_timeout, self.upstream.send(upstream_request)).await?;
        if response.status() != StatusCode::SWITCHING_PROTOCOLS {
            strip_hop_by_hop(response.headers_mut());
        }
        Ok(response)
    }

    /// Hand the upstream response to the client as a stream.
    pub fn relay(response: Response<Incoming>, request_id: &str) -> Response<Body> {
        let request_id = request_id.to_string();
        let (parts, body) = response.into_parts();
        let body = body.map_err(move |err| {
            tracing::warn!(
                request_id = %request_id,
                error = %err,
                "Upstream stream failed after headers were sent"
            );
            err
        });
        Response::from_parts(parts, Body::new(body))
    }
}
