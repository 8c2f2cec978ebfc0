//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path (+ upgrade flag)
//!     → matcher.rs (is the first segment a hostname?)
//!     → resolver.rs (explicit host or default target)
//!     → Return: RoutingDecision
//! ```
//!
//! # Design Decisions
//! - Resolution is a pure function of the path and the default target
//! - No regex in hot path (byte scan only)
//! - Deterministic: same input always yields the same decision

pub mod matcher;
pub mod resolver;

pub use resolver::{RoutingDecision, RoutingError, TargetResolver};
