//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Detect WebSocket upgrade requests
//! - Prepare request for forwarding to the resolved upstream
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Method, end-to-end headers and body forwarded verbatim; URI and `Host`
//!   change, hop-by-hop headers are dropped unless the request is an upgrade
//! - Upstream requests are always HTTP/1.1 (required for upgrades)

use axum::body::Body;
use axum::http::{
    header::{CONNECTION, HOST, UPGRADE},
    Extensions, HeaderValue, Request, Version,
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::error::ProxyError;
use crate::http::response::strip_hop_by_hop;
use crate::routing::{RoutingDecision, RoutingError};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Assigns a UUID v4 to requests arriving without an `x-request-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Read access to the request ID header.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> &str {
        self.headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

/// True for `Connection: upgrade` requests carrying an `Upgrade` header.
pub fn is_upgrade_request<B>(request: &Request<B>) -> bool {
    let has_connection = request
        .headers()
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.split(',').any(|token| token.trim().eq_ignore_ascii_case("upgrade")));
    has_connection && request.headers().contains_key(UPGRADE)
}

/// Point a client request at its upstream: absolute URI from the decision
/// and `Host` set to the target authority. Upgrade requests keep their
/// `Connection`/`Upgrade` pair; other requests lose hop-by-hop headers.
pub fn into_upstream_request(
    request: Request<Body>,
    decision: &RoutingDecision,
) -> Result<Request<Body>, ProxyError> {
    let uri = decision.upstream_uri()?;
    let authority = decision.authority();
    let host = HeaderValue::from_str(&authority)
        .map_err(|_| RoutingError::InvalidHost(authority.clone()))?;

    let upgrade = is_upgrade_request(&request);
    let (mut parts, body) = request.into_parts();
    if !upgrade {
        strip_hop_by_hop(&mut parts.headers);
    }
    parts.uri = uri;
    parts.version = Version::HTTP_11;
    parts.extensions = Extensions::new();
    parts.headers.insert(HOST, host);

    Ok(Request::from_parts(parts, body))
}
