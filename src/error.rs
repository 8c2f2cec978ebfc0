//! Per-request error taxonomy.
//!
//! Every variant is confined to the request that produced it. Startup
//! failures live in [`crate::config::ConfigError`] instead.

use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

use crate::rewrite::TransformError;
use crate::routing::RoutingError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid target: {0}")]
    InvalidTarget(#[from] RoutingError),

    #[error("upstream request failed: {0}")]
    UpstreamConnect(#[source] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    UpstreamTimeout(Duration),

    #[error("upstream body failed: {0}")]
    UpstreamBody(#[source] BoxError),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl ProxyError {
    /// Status reported to the client, provided nothing has been sent yet.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamConnect(_) | ProxyError::UpstreamBody(_) => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Transform(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short client-facing message. Internal details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            ProxyError::InvalidTarget(_) => "Target is not a valid absolute URL",
            ProxyError::UpstreamConnect(_) => "Upstream request failed",
            ProxyError::UpstreamTimeout(_) => "Upstream timed out",
            ProxyError::UpstreamBody(_) => "Upstream response failed",
            ProxyError::Transform(_) => "An error occurred while rewriting the response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let invalid = ProxyError::from(RoutingError::InvalidHost("1.2.3.999".into()));
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);

        let timeout = ProxyError::UpstreamTimeout(Duration::from_secs(30));
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let body = ProxyError::UpstreamBody("reset".into());
        assert_eq!(body.status_code(), StatusCode::BAD_GATEWAY);

        let transform = ProxyError::from(TransformError::BodyTooLarge { limit: 1 });
        assert_eq!(transform.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
