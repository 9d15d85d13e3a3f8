//! Single-use authorization codes produced by the consent step.
//!
//! A code is Created on approval and ends either Redeemed (removed on the
//! successful exchange) or Expired (removed by the sweep or by the lookup that
//! finds it stale). A failed exchange leaves a live code in place.

use crate::crypto::random_token;
use crate::error::AuthError;
use crate::pkce::PkceChallenge;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

const CODE_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub(crate) struct AuthorizationCode {
    pub client_id: String,
    pub redirect_uri: String,
    pub pkce: Option<PkceChallenge>,
    pub expires_at: DateTime<Utc>,
}

impl AuthorizationCode {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    fn requires_verifier(&self) -> bool {
        self.pkce.as_ref().is_some_and(PkceChallenge::is_enforced)
    }
}

/// What the caller presents at the token endpoint
#[derive(Debug, Clone, Copy)]
pub struct CodeRedemption<'a> {
    pub code: &'a str,
    pub client_id: Option<&'a str>,
    pub redirect_uri: &'a str,
    pub code_verifier: Option<&'a str>,
}

#[derive(Debug, Default)]
pub(crate) struct CodeStore {
    codes: HashMap<String, AuthorizationCode>,
}

impl CodeStore {
    pub fn create(
        &mut self,
        client_id: &str,
        redirect_uri: &str,
        pkce: Option<PkceChallenge>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> String {
        let code = random_token(CODE_BYTES);
        self.codes.insert(
            code.clone(),
            AuthorizationCode {
                client_id: client_id.to_string(),
                redirect_uri: redirect_uri.to_string(),
                pkce,
                expires_at: now + ttl,
            },
        );
        code
    }

    /// Validates a redemption and consumes the code on success.
    /// Returns the client id the tokens must be issued to.
    pub fn redeem(
        &mut self,
        redemption: CodeRedemption<'_>,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let Some(stored) = self.codes.get(redemption.code) else {
            return Err(AuthError::invalid_grant(
                "Invalid or expired authorization code",
            ));
        };

        if stored.is_expired(now) {
            self.codes.remove(redemption.code);
            return Err(AuthError::invalid_grant(
                "Invalid or expired authorization code",
            ));
        }

        match redemption.client_id {
            Some(client_id) if client_id != stored.client_id => {
                return Err(AuthError::invalid_grant("Client ID mismatch"));
            }
            None if !stored.requires_verifier() => {
                return Err(AuthError::invalid_grant(
                    "client_id is required for codes issued without PKCE",
                ));
            }
            _ => {}
        }

        if stored.redirect_uri != redemption.redirect_uri {
            return Err(AuthError::invalid_grant("Redirect URI mismatch"));
        }

        if let Some(pkce) = stored.pkce.as_ref().filter(|p| p.is_enforced()) {
            let Some(verifier) = redemption.code_verifier else {
                return Err(AuthError::invalid_grant("Code verifier required"));
            };
            if !pkce.verify(verifier) {
                return Err(AuthError::invalid_grant("Invalid code verifier"));
            }
        }

        let consumed = self
            .codes
            .remove(redemption.code)
            .ok_or_else(|| AuthError::invalid_grant("Invalid or expired authorization code"))?;
        Ok(consumed.client_id)
    }

    pub fn revoke_client(&mut self, client_id: &str) -> usize {
        let before = self.codes.len();
        self.codes.retain(|_, c| c.client_id != client_id);
        before - self.codes.len()
    }

    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.codes.len();
        self.codes.retain(|_, c| !c.is_expired(now));
        before - self.codes.len()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }
}
