pub(crate) use crate::config::oauth::OAuthConfig;
use confique::Config;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;

pub mod oauth;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] confique::Error),

    #[error("{name} must be between 1 and {max} seconds, got {value}")]
    InvalidTtl {
        name: &'static str,
        value: i64,
        max: i64,
    },
}

/// Env var naming an optional TOML file; environment variables take precedence
pub const CONFIG_FILE_ENV: &str = "MCP_CONFIG_FILE";

/// Main configuration structure for the gateway
#[derive(Debug, Config, Clone)]
pub struct GatewayConfig {
    /// Interface to bind (default: 0.0.0.0)
    #[config(env = "MCP_HOST", default = "0.0.0.0")]
    pub host: String,

    /// Port to listen on (default: 3000)
    #[config(env = "MCP_PORT", default = 3000)]
    pub port: u16,

    /// Externally visible base URL used in discovery documents and auth
    /// challenges. When unset it is derived from the request's Host header.
    #[config(env = "MCP_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Only this origin receives CORS headers; unset mirrors any origin
    #[config(env = "CORS_ALLOWED_ORIGIN")]
    pub cors_allowed_origin: Option<String>,

    /// Request body limit in bytes (default: 1 MiB)
    #[config(env = "MCP_MAX_BODY_BYTES", default = 1048576)]
    pub max_body_bytes: usize,

    /// Upper bound for a single session request in milliseconds (default: 30000)
    #[config(env = "MCP_SESSION_REQUEST_TIMEOUT_MS", default = 30000)]
    pub session_request_timeout_ms: u64,

    #[config(nested)]
    pub oauth: OAuthConfig,
}

impl GatewayConfig {
    /// Loads from the environment, then from the TOML file named by
    /// `MCP_CONFIG_FILE` if set
    pub fn new() -> Result<Self, ConfigError> {
        let mut builder = Self::builder().env();
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            builder = builder.file(path);
        }
        let config = builder.load()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.oauth.validate()
    }

    /// Binds the listener. `host` may be an IP address or a resolvable name.
    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind((self.host.as_str(), self.port)).await
    }

    pub fn session_request_timeout(&self) -> Duration {
        Duration::from_millis(self.session_request_timeout_ms)
    }

    #[cfg(test)]
    pub fn for_test(credentials_file: &std::path::Path) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            public_url: Some("https://hound.example.com".to_string()),
            cors_allowed_origin: None,
            max_body_bytes: 1024 * 1024,
            session_request_timeout_ms: 1000,
            oauth: OAuthConfig {
                credentials_file: credentials_file.display().to_string(),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
port = 8080
public_url = "https://search.example.com"

[oauth]
credentials_file = "/tmp/clients.json"
access_token_ttl = 600
"#
        )
        .unwrap();

        let config = GatewayConfig::builder()
            .file(file.path())
            .load()
            .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.public_url.as_deref(), Some("https://search.example.com"));
        assert_eq!(config.max_body_bytes, 1048576);
        assert_eq!(config.oauth.credentials_file, "/tmp/clients.json");
        assert_eq!(config.oauth.access_token_ttl, 600);
        assert_eq!(config.oauth.refresh_token_ttl, 2592000);
        assert_eq!(config.oauth.scope, "mcp");
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = GatewayConfig::builder().load().unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.session_request_timeout(), Duration::from_secs(30));
        assert!(config.cors_allowed_origin.is_none());
        assert_eq!(config.oauth.credentials_file, "/etc/mcp-hound/clients.json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_ttl_from_file_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[oauth]\nrefresh_token_ttl = -5").unwrap();

        let config = GatewayConfig::builder().file(file.path()).load().unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidTtl {
                name: "refresh_token_ttl",
                value: -5,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_bind_resolves_host_name() {
        let mut config = GatewayConfig::for_test(std::path::Path::new("/tmp/clients.json"));
        config.host = "localhost".to_string();
        config.port = 0;

        let listener = config.bind().await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }
}
