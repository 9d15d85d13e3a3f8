use crate::api::mcp::handler::{GatewayHandler, SessionHandler};
use crate::config::GatewayConfig;
use hound_auth::{AuthService, Clock, CredentialStore, SessionRegistry, SystemClock};
use http::header::HOST;
use http::HeaderMap;
use std::sync::Arc;

/// Everything a request handler can reach. Built once in `main` and cloned
/// into every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub auth: Arc<AuthService>,
    pub sessions: Arc<SessionRegistry>,
    pub handler: Arc<dyn SessionHandler>,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build with a specific time source for token and code expiry
    pub fn with_clock(config: GatewayConfig, clock: Arc<dyn Clock>) -> Self {
        let credentials = CredentialStore::new(&config.oauth.credentials_file)
            .with_io_timeout(config.oauth.credentials_io_timeout());
        let sessions = Arc::new(SessionRegistry::new());
        let auth = AuthService::new(credentials, config.oauth.lifetimes())
            .with_clock(clock)
            .with_sessions(Arc::clone(&sessions));

        Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
            sessions,
            handler: Arc::new(GatewayHandler),
        }
    }

    /// Replace the tool-layer handler
    pub fn with_handler(mut self, handler: Arc<dyn SessionHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// Externally visible base URL, without a trailing slash
    pub fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(url) = &self.config.public_url {
            return url.trim_end_matches('/').to_string();
        }
        match headers.get(HOST).and_then(|h| h.to_str().ok()) {
            Some(host) => format!("https://{}", host),
            None => format!("https://localhost:{}", self.config.port),
        }
    }
}
