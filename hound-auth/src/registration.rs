//! Dynamic client registration (RFC 7591) request and response documents.

use crate::credentials::NewClient;
use crate::grants::{GRANT_AUTHORIZATION_CODE, GRANT_CLIENT_CREDENTIALS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Client metadata submitted for registration. Everything is optional and only
/// `client_name` and `redirect_uris` influence the result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientRegistrationRequest {
    pub client_name: Option<String>,
    pub redirect_uris: Option<Vec<String>>,
    pub grant_types: Option<Vec<String>>,
    pub token_endpoint_auth_method: Option<String>,
}

impl ClientRegistrationRequest {
    /// The supplied name, or a generated `dynamic-client-<epoch millis>`
    pub fn resolved_name(&self, now: DateTime<Utc>) -> String {
        match self.client_name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => format!("dynamic-client-{}", now.timestamp_millis()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRegistration {
    pub client_id: String,
    pub client_secret: String,
    pub client_name: String,
    pub client_id_issued_at: i64,
    /// 0 means the secret never expires
    pub client_secret_expires_at: i64,
    pub grant_types: Vec<String>,
    pub redirect_uris: Vec<String>,
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: String,
    pub scope: String,
}

impl ClientRegistration {
    pub fn new(client: NewClient, redirect_uris: Vec<String>, scope: &str) -> Self {
        Self {
            client_id: client.client_id,
            client_secret: client.client_secret,
            client_name: client.name,
            client_id_issued_at: client.created_at.timestamp(),
            client_secret_expires_at: 0,
            grant_types: vec![
                GRANT_CLIENT_CREDENTIALS.to_string(),
                GRANT_AUTHORIZATION_CODE.to_string(),
            ],
            redirect_uris,
            response_types: vec!["code".to_string(), "token".to_string()],
            token_endpoint_auth_method: "client_secret_post".to_string(),
            scope: scope.to_string(),
        }
    }
}
