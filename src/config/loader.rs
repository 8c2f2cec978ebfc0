//! Configuration loading from the environment and disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

use crate::config::schema::{ProxyConfig, Settings, DEFAULT_LISTEN_PORT};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading. Every variant is fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TARGET_URL is required")]
    MissingTargetUrl,

    #[error("TARGET_URL `{value}` is not a valid absolute URL: {source}")]
    InvalidTargetUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("RENDER_EXTERNAL_URL `{0}` is not a valid URL with a host")]
    InvalidExternalUrl(String),

    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Raw configuration inputs, as collected from the CLI and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub port: Option<u16>,
    pub target_url: Option<String>,
    pub external_url: Option<String>,
    pub settings_path: Option<PathBuf>,
}

/// Assemble and validate the process configuration.
pub fn load_config(sources: ConfigSources) -> Result<ProxyConfig, ConfigError> {
    let raw_target = sources
        .target_url
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::MissingTargetUrl)?;
    let default_target_url =
        Url::parse(raw_target.trim()).map_err(|source| ConfigError::InvalidTargetUrl {
            value: raw_target.clone(),
            source,
        })?;

    let public_hostname = sources
        .external_url
        .filter(|value| !value.trim().is_empty())
        .map(|value| external_hostname(&value))
        .transpose()?;

    let settings = match sources.settings_path.as_deref() {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };

    let config = ProxyConfig::with_settings(
        sources.port.unwrap_or(DEFAULT_LISTEN_PORT),
        default_target_url,
        public_hostname,
        settings,
    );
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load tunables from a TOML settings file.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

fn external_hostname(value: &str) -> Result<String, ConfigError> {
    Url::parse(value.trim())
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .ok_or_else(|| ConfigError::InvalidExternalUrl(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sources(target: Option<&str>) -> ConfigSources {
        ConfigSources {
            target_url: target.map(str::to_string),
            ..ConfigSources::default()
        }
    }

    #[test]
    fn missing_target_is_fatal() {
        assert!(matches!(load_config(sources(None)), Err(ConfigError::MissingTargetUrl)));
        assert!(matches!(load_config(sources(Some("  "))), Err(ConfigError::MissingTargetUrl)));
    }

    #[test]
    fn relative_target_is_rejected() {
        let err = load_config(sources(Some("example.com/app"))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTargetUrl { .. }));
    }

    #[test]
    fn public_hostname_defaults_to_localhost_and_port() {
        let mut src = sources(Some("https://origin.example.com"));
        src.port = Some(3000);
        let config = load_config(src).unwrap();
        assert_eq!(config.listen_port, 3000);
        assert_eq!(config.public_hostname, "localhost:3000");
        assert_eq!(config.default_target_url.host_str(), Some("origin.example.com"));
    }

    #[test]
    fn public_hostname_comes_from_external_url() {
        let mut src = sources(Some("https://origin.example.com"));
        src.external_url = Some("https://my-proxy.onrender.com".into());
        let config = load_config(src).unwrap();
        assert_eq!(config.listen_port, DEFAULT_LISTEN_PORT);
        assert_eq!(config.public_hostname, "my-proxy.onrender.com");
    }

    #[test]
    fn settings_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[timeouts]\nresponse_secs = 5\n\n[limits]\nmax_html_body_bytes = 4096"
        )
        .unwrap();

        let mut src = sources(Some("http://127.0.0.1:9000"));
        src.settings_path = Some(file.path().to_path_buf());
        let config = load_config(src).unwrap();

        assert_eq!(config.timeouts.response_secs, 5);
        assert_eq!(config.timeouts.connect_secs, 10);
        assert_eq!(config.limits.max_html_body_bytes, 4096);
    }

    #[test]
    fn unreadable_settings_file_is_reported() {
        let mut src = sources(Some("https://origin.example.com"));
        src.settings_path = Some(PathBuf::from("/nonexistent/rewrite-proxy.toml"));
        assert!(matches!(load_config(src), Err(ConfigError::Io { .. })));
    }
}
