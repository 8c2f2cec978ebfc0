//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → connector (connect timeout)
//!     → timeouts.rs (deadline for response headers)
//!     → On failure: mapped to 502/504, never retried
//! ```
//!
//! # Design Decisions
//! - Every upstream call has a deadline
//! - No retries: request bodies are streamed and cannot be replayed

pub mod timeouts;
