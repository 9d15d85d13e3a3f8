//! The authorization service: one instance per process, shared by reference.
//!
//! Token and code state lives behind a single lock. Every operation that
//! touches it runs to completion under that lock without awaiting, so no
//! caller can observe a half-applied grant. Credential file I/O never
//! happens while the lock is held.

use crate::clock::{Clock, SystemClock};
use crate::codes::{CodeRedemption, CodeStore};
use crate::credentials::{ClientIdentity, ClientSummary, CredentialStore, NewClient};
use crate::error::{AuthError, CredentialError};
use crate::grants::GrantRequest;
use crate::pkce::PkceChallenge;
use crate::registration::{ClientRegistration, ClientRegistrationRequest};
use crate::session::SessionRegistry;
use crate::tokens::{BearerIdentity, TokenLifetimes, TokenPair, TokenStore};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Default)]
struct AuthState {
    tokens: TokenStore,
    codes: CodeStore,
}

impl AuthState {
    fn sweep(&mut self, now: DateTime<Utc>) -> SweepReport {
        let (access_tokens, refresh_tokens) = self.tokens.sweep(now);
        let codes = self.codes.sweep(now);
        SweepReport {
            access_tokens,
            refresh_tokens,
            codes,
        }
    }

    fn issue(
        &mut self,
        client_id: &str,
        now: DateTime<Utc>,
        lifetimes: &TokenLifetimes,
    ) -> TokenPair {
        let swept = self.sweep(now);
        if !swept.is_empty() {
            debug!("Swept expired entries: {:?}", swept);
        }
        self.tokens.insert_pair(client_id, now, lifetimes)
    }
}

/// Counts of entries removed by a sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SweepReport {
    access_tokens: usize,
    refresh_tokens: usize,
    codes: usize,
}

impl SweepReport {
    fn is_empty(&self) -> bool {
        self.access_tokens + self.refresh_tokens + self.codes == 0
    }
}

/// Live entry counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuthStats {
    pub access_tokens: usize,
    pub refresh_tokens: usize,
    pub codes: usize,
}

/// What revoking a client removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Revocation {
    /// Whether the credential file held the client
    pub removed: bool,
    pub access_tokens: usize,
    pub refresh_tokens: usize,
    pub codes: usize,
    pub sessions: usize,
}

pub struct AuthService {
    credentials: CredentialStore,
    state: Mutex<AuthState>,
    clock: Arc<dyn Clock>,
    lifetimes: TokenLifetimes,
    /// Sessions opened by a client are closed when the client is revoked
    sessions: Option<Arc<SessionRegistry>>,
}

impl AuthService {
    pub fn new(credentials: CredentialStore, lifetimes: TokenLifetimes) -> Self {
        Self {
            credentials,
            state: Mutex::new(AuthState::default()),
            clock: Arc::new(SystemClock),
            lifetimes,
            sessions: None,
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Close a revoked client's sessions in `sessions` as part of the cascade
    pub fn with_sessions(mut self, sessions: Arc<SessionRegistry>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Issues a fresh token pair, sweeping expired state first
    pub fn issue(&self, client_id: &str) -> TokenPair {
        let now = self.clock.now();
        let pair = self.state.lock().issue(client_id, now, &self.lifetimes);
        info!("Issued token pair for client '{}'", client_id);
        pair
    }

    /// Rotates a refresh token. The presented token is consumed even when the
    /// exchange fails.
    ///
    /// The owning client must still be listed in the credential file. A client
    /// removed there (for example by the `hound-auth revoke` command) has its
    /// remaining tokens, codes and sessions dropped and the grant fails.
    pub async fn redeem_refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let now = self.clock.now();
        let client_id = self.state.lock().tokens.take_refresh(refresh_token, now)?;

        if self.credentials.find(&client_id).await.is_none() {
            warn!(
                "Refresh token presented for client '{}' which is no longer registered",
                client_id
            );
            self.purge_client(&client_id);
            return Err(AuthError::invalid_grant("Client is no longer registered"));
        }

        let now = self.clock.now();
        let pair = self.state.lock().issue(&client_id, now, &self.lifetimes);

        info!("Rotated refresh token for client '{}'", client_id);
        Ok(pair)
    }

    /// Checks a bearer token; an expired token is deleted on the way out
    pub fn validate_bearer(&self, token: &str) -> Option<BearerIdentity> {
        let now = self.clock.now();
        self.state.lock().tokens.validate_access(token, now)
    }

    /// Records an approved authorization request and returns the code
    pub fn create_authorization_code(
        &self,
        client_id: &str,
        redirect_uri: &str,
        pkce: Option<PkceChallenge>,
    ) -> String {
        let now = self.clock.now();
        let code = self.state.lock().codes.create(
            client_id,
            redirect_uri,
            pkce,
            now,
            self.lifetimes.authorization_code,
        );
        debug!("Created authorization code for client '{}'", client_id);
        code
    }

    /// Redeems an authorization code for a token pair. The code is consumed
    /// and the pair issued under one lock acquisition.
    pub fn exchange_code(&self, redemption: CodeRedemption<'_>) -> Result<TokenPair, AuthError> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let client_id = state.codes.redeem(redemption, now)?;
        let pair = state.issue(&client_id, now, &self.lifetimes);
        drop(state);

        info!("Exchanged authorization code for client '{}'", client_id);
        Ok(pair)
    }

    /// Runs a token endpoint grant
    pub async fn grant(&self, request: GrantRequest) -> Result<TokenPair, AuthError> {
        let grant_type = request.grant_type();
        let result = match request {
            GrantRequest::ClientCredentials {
                client_id,
                client_secret,
            } => match self.validate_client(&client_id, &client_secret).await {
                Some(identity) => Ok(self.issue(&identity.client_id)),
                None => Err(AuthError::invalid_client("Invalid client credentials")),
            },
            GrantRequest::AuthorizationCode {
                code,
                redirect_uri,
                client_id,
                code_verifier,
            } => self.exchange_code(CodeRedemption {
                code: &code,
                client_id: client_id.as_deref(),
                redirect_uri: &redirect_uri,
                code_verifier: code_verifier.as_deref(),
            }),
            GrantRequest::RefreshToken { refresh_token } => {
                self.redeem_refresh(&refresh_token).await
            }
        };

        if let Err(e) = &result {
            warn!("Rejected {} grant: {}", grant_type, e);
        }
        result
    }

    pub async fn validate_client(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Option<ClientIdentity> {
        self.credentials.validate(client_id, client_secret).await
    }

    pub async fn find_client(&self, client_id: &str) -> Option<ClientSummary> {
        self.credentials.find(client_id).await
    }

    pub async fn create_client(&self, name: &str) -> Result<NewClient, CredentialError> {
        self.credentials.create(name, self.clock.now()).await
    }

    /// Dynamic registration: creates a client and returns its full record
    pub async fn register_client(
        &self,
        request: ClientRegistrationRequest,
    ) -> Result<ClientRegistration, CredentialError> {
        let now = self.clock.now();
        let name = request.resolved_name(now);
        let client = self.credentials.create(&name, now).await?;
        Ok(ClientRegistration::new(
            client,
            request.redirect_uris.unwrap_or_default(),
            &self.lifetimes.scope,
        ))
    }

    pub async fn list_clients(&self) -> Result<Vec<ClientSummary>, CredentialError> {
        self.credentials.list().await
    }

    /// Removes the client from the credential file and drops all of its live
    /// tokens, pending codes and open sessions. In-memory state is purged even
    /// when the file no longer lists the client.
    pub async fn revoke_client(&self, client_id: &str) -> Result<Revocation, CredentialError> {
        let removed = self.credentials.remove(client_id).await?;
        Ok(Revocation {
            removed,
            ..self.purge_client(client_id)
        })
    }

    /// Drops everything held in memory on behalf of `client_id`
    fn purge_client(&self, client_id: &str) -> Revocation {
        let mut state = self.state.lock();
        let (access_tokens, refresh_tokens) = state.tokens.revoke_client(client_id);
        let codes = state.codes.revoke_client(client_id);
        drop(state);

        let sessions = self
            .sessions
            .as_ref()
            .map_or(0, |registry| registry.close_client(client_id));

        info!(
            "Revoked client '{}': {} access token(s), {} refresh token(s), {} code(s), {} session(s)",
            client_id, access_tokens, refresh_tokens, codes, sessions
        );

        Revocation {
            removed: false,
            access_tokens,
            refresh_tokens,
            codes,
            sessions,
        }
    }

    /// Live entry counts, reported by the gateway's health endpoint
    pub fn stats(&self) -> AuthStats {
        let state = self.state.lock();
        AuthStats {
            access_tokens: state.tokens.access_len(),
            refresh_tokens: state.tokens.refresh_len(),
            codes: state.codes.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::pkce::{S256, s256_challenge};
    use crate::session::{SessionTransport, StreamableHttpTransport};
    use chrono::Duration;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> (AuthService, ManualClock) {
        let clock = ManualClock::default();
        let store = CredentialStore::new(dir.path().join("clients.json"));
        let service = AuthService::new(store, TokenLifetimes::default())
            .with_clock(Arc::new(clock.clone()));
        (service, clock)
    }

    #[tokio::test]
    async fn test_client_credentials_grant() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(&dir);
        let client = service.create_client("ci-bot").await.unwrap();

        let pair = service
            .grant(GrantRequest::ClientCredentials {
                client_id: client.client_id.clone(),
                client_secret: client.client_secret.clone(),
            })
            .await
            .unwrap();
        assert_eq!(
            service.validate_bearer(&pair.access_token).unwrap().client_id,
            client.client_id
        );

        let err = service
            .grant(GrantRequest::ClientCredentials {
                client_id: client.client_id,
                client_secret: "wrong".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "invalid_client");
    }

    #[tokio::test]
    async fn test_issue_sweeps_all_stores() {
        let dir = TempDir::new().unwrap();
        let (service, clock) = service(&dir);
        service.issue("mcp_a");
        service.create_authorization_code("mcp_a", "https://example.com/cb", None);

        clock.advance(Duration::days(31));
        service.issue("mcp_b");

        assert_eq!(
            service.stats(),
            AuthStats {
                access_tokens: 1,
                refresh_tokens: 1,
                codes: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_exchange_code_with_pkce() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(&dir);
        let verifier = "verifier-verifier-verifier-verifier-verifier";
        let code = service.create_authorization_code(
            "mcp_pub",
            "https://example.com/cb",
            Some(PkceChallenge::new(
                s256_challenge(verifier),
                Some(S256.to_string()),
            )),
        );

        let pair = service
            .grant(GrantRequest::AuthorizationCode {
                code: code.clone(),
                redirect_uri: "https://example.com/cb".to_string(),
                client_id: None,
                code_verifier: Some(verifier.to_string()),
            })
            .await
            .unwrap();
        assert_eq!(
            service.validate_bearer(&pair.access_token).unwrap().client_id,
            "mcp_pub"
        );
        assert_eq!(service.stats().codes, 0);
    }

    #[tokio::test]
    async fn test_revoke_cascades() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(&dir);
        let sessions = Arc::new(SessionRegistry::new());
        let service = service.with_sessions(Arc::clone(&sessions));

        let a = service.create_client("a").await.unwrap();
        let pair_a = service.issue(&a.client_id);
        let pair_b = service.issue("mcp_other");
        service.create_authorization_code(&a.client_id, "https://example.com/cb", None);
        sessions
            .register(
                "s1",
                SessionTransport::StreamableHttp(StreamableHttpTransport::new(&a.client_id)),
            )
            .unwrap();

        let revocation = service.revoke_client(&a.client_id).await.unwrap();
        assert_eq!(
            revocation,
            Revocation {
                removed: true,
                access_tokens: 1,
                refresh_tokens: 1,
                codes: 1,
                sessions: 1,
            }
        );
        assert!(service.validate_bearer(&pair_a.access_token).is_none());
        assert!(service.redeem_refresh(&pair_a.refresh_token).await.is_err());
        assert!(service.validate_bearer(&pair_b.access_token).is_some());
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_for_unlisted_client_purges_it() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(&dir);
        let first = service.issue("mcp_gone");
        let second = service.issue("mcp_gone");

        let err = service.redeem_refresh(&first.refresh_token).await.unwrap_err();
        assert_eq!(err.error_code(), "invalid_grant");
        assert_eq!(err.description(), "Client is no longer registered");

        assert!(service.validate_bearer(&second.access_token).is_none());
        assert_eq!(service.stats(), AuthStats::default());
    }

    #[tokio::test]
    async fn test_created_at_follows_clock() {
        let dir = TempDir::new().unwrap();
        let (service, clock) = service(&dir);
        clock.advance(Duration::days(3));

        let client = service.create_client("ci-bot").await.unwrap();
        assert_eq!(client.created_at, clock.now());
        let listed = service.list_clients().await.unwrap();
        assert_eq!(listed[0].created_at, clock.now());

        let registration = service
            .register_client(ClientRegistrationRequest::default())
            .await
            .unwrap();
        assert_eq!(
            registration.client_name,
            format!("dynamic-client-{}", clock.now().timestamp_millis())
        );
        assert_eq!(registration.client_id_issued_at, clock.now().timestamp());
    }

    #[tokio::test]
    async fn test_register_client() {
        let dir = TempDir::new().unwrap();
        let (service, _) = service(&dir);

        let registration = service
            .register_client(ClientRegistrationRequest {
                client_name: Some("Claude".to_string()),
                redirect_uris: Some(vec!["https://example.com/cb".to_string()]),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(registration.client_id.starts_with("mcp_"));
        assert_eq!(registration.scope, "mcp");
        assert!(
            service
                .validate_client(&registration.client_id, &registration.client_secret)
                .await
                .is_some()
        );
    }
}
