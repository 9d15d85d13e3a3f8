//! Authorization server configuration

use crate::config::ConfigError;
use chrono::Duration;
use confique::Config;
use hound_auth::TokenLifetimes;
use std::time::Duration as StdDuration;

/// Upper bound for every token and code lifetime: ten years
pub const MAX_TTL_SECONDS: i64 = 10 * 365 * 24 * 3600;

#[derive(Debug, Config, Clone)]
pub struct OAuthConfig {
    /// Client credential file (default: /etc/mcp-hound/clients.json)
    #[config(env = "MCP_CREDENTIALS_FILE", default = "/etc/mcp-hound/clients.json")]
    pub credentials_file: String,

    /// Upper bound for a single credential file operation in milliseconds (default: 2000)
    #[config(env = "MCP_CREDENTIALS_IO_TIMEOUT_MS", default = 2000)]
    pub credentials_io_timeout_ms: u64,

    /// Access token lifetime in seconds (default: 3600)
    #[config(env = "MCP_ACCESS_TOKEN_TTL", default = 3600)]
    pub access_token_ttl: i64,

    /// Refresh token lifetime in seconds (default: 30 days)
    #[config(env = "MCP_REFRESH_TOKEN_TTL", default = 2592000)]
    pub refresh_token_ttl: i64,

    /// Authorization code lifetime in seconds (default: 60)
    #[config(env = "MCP_AUTH_CODE_TTL", default = 60)]
    pub auth_code_ttl: i64,

    /// Scope granted with every token (default: mcp)
    #[config(env = "MCP_OAUTH_SCOPE", default = "mcp")]
    pub scope: String,
}

impl OAuthConfig {
    /// Every lifetime must be positive and small enough to add to a timestamp
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ttls = [
            ("access_token_ttl", self.access_token_ttl),
            ("refresh_token_ttl", self.refresh_token_ttl),
            ("auth_code_ttl", self.auth_code_ttl),
        ];
        for (name, value) in ttls {
            if !(1..=MAX_TTL_SECONDS).contains(&value) {
                return Err(ConfigError::InvalidTtl {
                    name,
                    value,
                    max: MAX_TTL_SECONDS,
                });
            }
        }
        Ok(())
    }

    /// Lifetimes for the token issuer. Call [`validate`](Self::validate) first.
    pub fn lifetimes(&self) -> TokenLifetimes {
        TokenLifetimes {
            access_token: Duration::seconds(self.access_token_ttl),
            refresh_token: Duration::seconds(self.refresh_token_ttl),
            authorization_code: Duration::seconds(self.auth_code_ttl),
            scope: self.scope.clone(),
        }
    }

    pub fn credentials_io_timeout(&self) -> StdDuration {
        StdDuration::from_millis(self.credentials_io_timeout_ms)
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            credentials_file: hound_auth::DEFAULT_CREDENTIALS_FILE.to_string(),
            credentials_io_timeout_ms: 2000,
            access_token_ttl: 3600,
            refresh_token_ttl: 30 * 24 * 3600,
            auth_code_ttl: 60,
            scope: "mcp".to_string(),
        }
    }
}
