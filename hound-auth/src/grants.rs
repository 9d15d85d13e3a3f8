//! Token endpoint parameters and their translation into typed grants.

use crate::error::AuthError;
use serde::Deserialize;

pub const GRANT_CLIENT_CREDENTIALS: &str = "client_credentials";
pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";

/// Raw token request parameters, as found in a form or JSON body.
///
/// Client credentials from an HTTP Basic header are merged in by the HTTP
/// layer before conversion; values from the body take precedence.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenParams {
    pub grant_type: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
    pub refresh_token: Option<String>,
}

impl TokenParams {
    /// Fill client credentials that the body left unset
    pub fn with_basic_credentials(mut self, client_id: String, client_secret: String) -> Self {
        if non_empty(&self.client_id).is_none() {
            self.client_id = Some(client_id);
        }
        if non_empty(&self.client_secret).is_none() {
            self.client_secret = Some(client_secret);
        }
        self
    }
}

/// A validated grant request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantRequest {
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
    AuthorizationCode {
        code: String,
        redirect_uri: String,
        client_id: Option<String>,
        code_verifier: Option<String>,
    },
    RefreshToken {
        refresh_token: String,
    },
}

impl GrantRequest {
    pub fn grant_type(&self) -> &'static str {
        match self {
            Self::ClientCredentials { .. } => GRANT_CLIENT_CREDENTIALS,
            Self::AuthorizationCode { .. } => GRANT_AUTHORIZATION_CODE,
            Self::RefreshToken { .. } => GRANT_REFRESH_TOKEN,
        }
    }
}

impl TryFrom<TokenParams> for GrantRequest {
    type Error = AuthError;

    fn try_from(params: TokenParams) -> Result<Self, Self::Error> {
        let grant_type = non_empty(&params.grant_type)
            .ok_or_else(|| AuthError::invalid_request("Missing grant_type"))?;

        match grant_type {
            GRANT_CLIENT_CREDENTIALS => {
                match (non_empty(&params.client_id), non_empty(&params.client_secret)) {
                    (Some(client_id), Some(client_secret)) => Ok(Self::ClientCredentials {
                        client_id: client_id.to_string(),
                        client_secret: client_secret.to_string(),
                    }),
                    _ => Err(AuthError::invalid_request("Missing client credentials")),
                }
            }
            GRANT_AUTHORIZATION_CODE => {
                match (non_empty(&params.code), non_empty(&params.redirect_uri)) {
                    (Some(code), Some(redirect_uri)) => Ok(Self::AuthorizationCode {
                        code: code.to_string(),
                        redirect_uri: redirect_uri.to_string(),
                        client_id: non_empty(&params.client_id).map(str::to_string),
                        code_verifier: non_empty(&params.code_verifier).map(str::to_string),
                    }),
                    _ => Err(AuthError::invalid_request(
                        "Missing required parameters (code, redirect_uri)",
                    )),
                }
            }
            GRANT_REFRESH_TOKEN => non_empty(&params.refresh_token)
                .map(|token| Self::RefreshToken {
                    refresh_token: token.to_string(),
                })
                .ok_or_else(|| AuthError::invalid_request("Missing refresh_token")),
            other => Err(AuthError::UnsupportedGrantType(format!(
                "Grant type '{}' is not supported",
                other
            ))),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
