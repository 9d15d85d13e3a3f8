//! In-memory access and refresh token stores.

use crate::crypto::random_token;
use crate::error::AuthError;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const TOKEN_TYPE_BEARER: &str = "Bearer";
pub const DEFAULT_SCOPE: &str = "mcp";

const ACCESS_TOKEN_BYTES: usize = 32;
const REFRESH_TOKEN_BYTES: usize = 48;

/// Lifetimes of everything the issuer hands out
#[derive(Debug, Clone)]
pub struct TokenLifetimes {
    pub access_token: Duration,
    pub refresh_token: Duration,
    pub authorization_code: Duration,
    pub scope: String,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access_token: Duration::seconds(3600),
            refresh_token: Duration::days(30),
            authorization_code: Duration::seconds(60),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }
}

/// The token endpoint's success body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TokenRecord {
    pub client_id: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Result of a successful bearer check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerIdentity {
    pub client_id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub(crate) struct TokenStore {
    access: HashMap<String, TokenRecord>,
    refresh: HashMap<String, TokenRecord>,
}

impl TokenStore {
    /// Mints and stores a fresh access/refresh pair
    pub fn insert_pair(
        &mut self,
        client_id: &str,
        now: DateTime<Utc>,
        lifetimes: &TokenLifetimes,
    ) -> TokenPair {
        let access_token = random_token(ACCESS_TOKEN_BYTES);
        let refresh_token = random_token(REFRESH_TOKEN_BYTES);

        self.access.insert(
            access_token.clone(),
            TokenRecord {
                client_id: client_id.to_string(),
                expires_at: now + lifetimes.access_token,
            },
        );
        self.refresh.insert(
            refresh_token.clone(),
            TokenRecord {
                client_id: client_id.to_string(),
                expires_at: now + lifetimes.refresh_token,
            },
        );

        TokenPair {
            access_token,
            refresh_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: lifetimes.access_token.num_seconds(),
            scope: lifetimes.scope.clone(),
        }
    }

    /// Removes a refresh token and returns its owner. The token is gone
    /// afterwards whether or not it was still live.
    pub fn take_refresh(&mut self, token: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let record = self
            .refresh
            .remove(token)
            .ok_or_else(|| AuthError::invalid_grant("Invalid refresh token"))?;

        if record.is_expired(now) {
            return Err(AuthError::invalid_grant("Refresh token expired"));
        }

        Ok(record.client_id)
    }

    /// Looks up an access token, deleting it if it has expired
    pub fn validate_access(&mut self, token: &str, now: DateTime<Utc>) -> Option<BearerIdentity> {
        let record = self.access.get(token)?;

        if record.is_expired(now) {
            self.access.remove(token);
            debug!("Dropped expired access token on lookup");
            return None;
        }

        Some(BearerIdentity {
            client_id: record.client_id.clone(),
            expires_at: record.expires_at,
        })
    }

    /// Drops every token owned by `client_id`; returns (access, refresh) removed
    pub fn revoke_client(&mut self, client_id: &str) -> (usize, usize) {
        let access_before = self.access.len();
        let refresh_before = self.refresh.len();
        self.access.retain(|_, r| r.client_id != client_id);
        self.refresh.retain(|_, r| r.client_id != client_id);
        (
            access_before - self.access.len(),
            refresh_before - self.refresh.len(),
        )
    }

    /// Drops expired entries; returns (access, refresh) removed
    pub fn sweep(&mut self, now: DateTime<Utc>) -> (usize, usize) {
        let access_before = self.access.len();
        let refresh_before = self.refresh.len();
        self.access.retain(|_, r| !r.is_expired(now));
        self.refresh.retain(|_, r| !r.is_expired(now));
        (
            access_before - self.access.len(),
            refresh_before - self.refresh.len(),
        )
    }

    pub fn access_len(&self) -> usize {
        self.access.len()
    }

    pub fn refresh_len(&self) -> usize {
        self.refresh.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_shape() {
        let mut store = TokenStore::default();
        let now = Utc::now();
        let pair = store.insert_pair("mcp_a", now, &TokenLifetimes::default());

        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 3600);
        assert_eq!(pair.scope, "mcp");
        assert_eq!(pair.access_token.len(), 43);
        assert_eq!(pair.refresh_token.len(), 64);
        assert_ne!(pair.access_token, pair.refresh_token);
    }

    #[test]
    fn test_access_token_expiry_is_self_cleaning() {
        let mut store = TokenStore::default();
        let now = Utc::now();
        let pair = store.insert_pair("mcp_a", now, &TokenLifetimes::default());

        // still valid at the exact expiry instant
        let at_expiry = now + Duration::seconds(3600);
        assert!(store.validate_access(&pair.access_token, at_expiry).is_some());

        let after = at_expiry + Duration::seconds(1);
        assert!(store.validate_access(&pair.access_token, after).is_none());
        assert_eq!(store.access_len(), 0);
    }

    #[test]
    fn test_take_refresh_is_single_use() {
        let mut store = TokenStore::default();
        let now = Utc::now();
        let pair = store.insert_pair("mcp_a", now, &TokenLifetimes::default());

        assert_eq!(store.take_refresh(&pair.refresh_token, now).unwrap(), "mcp_a");
        assert_eq!(
            store.take_refresh(&pair.refresh_token, now),
            Err(AuthError::invalid_grant("Invalid refresh token"))
        );
    }

    #[test]
    fn test_expired_refresh_is_deleted() {
        let mut store = TokenStore::default();
        let now = Utc::now();
        let pair = store.insert_pair("mcp_a", now, &TokenLifetimes::default());

        let later = now + Duration::days(31);
        assert_eq!(
            store.take_refresh(&pair.refresh_token, later),
            Err(AuthError::invalid_grant("Refresh token expired"))
        );
        assert_eq!(store.refresh_len(), 0);
    }

    #[test]
    fn test_revoke_client_only_touches_that_client() {
        let mut store = TokenStore::default();
        let now = Utc::now();
        let lifetimes = TokenLifetimes::default();
        let a = store.insert_pair("mcp_a", now, &lifetimes);
        store.insert_pair("mcp_a", now, &lifetimes);
        let b = store.insert_pair("mcp_b", now, &lifetimes);

        assert_eq!(store.revoke_client("mcp_a"), (2, 2));
        assert!(store.validate_access(&a.access_token, now).is_none());
        assert!(store.validate_access(&b.access_token, now).is_some());
    }

    #[test]
    fn test_sweep() {
        let mut store = TokenStore::default();
        let now = Utc::now();
        store.insert_pair("mcp_a", now, &TokenLifetimes::default());

        assert_eq!(store.sweep(now + Duration::hours(2)), (1, 0));
        assert_eq!(store.sweep(now + Duration::days(31)), (0, 1));
        assert_eq!(store.access_len() + store.refresh_len(), 0);
    }
}
