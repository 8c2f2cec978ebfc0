//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing span)
//!     → routing (RoutingDecision from the path)
//!     → request.rs (absolute upstream URI, Host rewrite)
//!     → client.rs (pooled upstream connection)
//!     → forward.rs (stream response)      | rewrite (buffer + inject HTML)
//!     → websocket.rs (upgrade tunnel)     |
//!     → response.rs (errors → status codes)
//!     → Send to client
//! ```

pub mod client;
pub mod forward;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use client::{HttpsUpstream, UpstreamClient, UpstreamResult};
pub use forward::StreamForwarder;
pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
