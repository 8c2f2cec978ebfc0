//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound the wait for upstream response headers
//! - Cancel the upstream exchange cleanly when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Connect timeouts live in the connector and surface as connect errors (502)
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use hyper_util::client::legacy::Error as ClientError;

use crate::error::ProxyError;

/// Await an upstream exchange for at most `deadline`.
pub async fn upstream_deadline<T, F>(deadline: Duration, exchange: F) -> Result<T, ProxyError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    match tokio::time::timeout(deadline, exchange).await {
        Ok(result) => result.map_err(ProxyError::UpstreamConnect),
        Err(_) => Err(ProxyError::UpstreamTimeout(deadline)),
    }
}
