//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! PORT / TARGET_URL / RENDER_EXTERNAL_URL (env or CLI flags)
//! optional settings file (TOML)
//!     → loader.rs (collect & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to request tasks
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - Settings file fields all have defaults to allow minimal configs
//! - Any load or validation failure is fatal before the listener binds

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, ConfigSources};
pub use schema::LimitsConfig;
pub use schema::ObservabilityConfig;
pub use schema::ProxyConfig;
pub use schema::Settings;
pub use schema::TimeoutConfig;
