//! Disk-backed client credential store.
//!
//! The JSON file is the source of truth and is re-read on every call. Only the
//! SHA-256 digest of a secret is ever written; the plaintext secret leaves this
//! module exactly once, from [`CredentialStore::create`].
//!
//! Writes are read-modify-write without locking. Concurrent mutation from the
//! CLI and a running server is assumed not to happen.

use crate::crypto::{constant_time_eq, hash_secret, random_token};
use crate::error::CredentialError;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default credential file location
pub const DEFAULT_CREDENTIALS_FILE: &str = "/etc/mcp-hound/clients.json";

pub const CLIENT_ID_PREFIX: &str = "mcp_";

const CLIENT_ID_BYTES: usize = 16;
const CLIENT_SECRET_BYTES: usize = 32;

/// A persisted client record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCredential {
    pub client_id: String,
    pub client_secret_hash: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A client as shown to operators. Carries no secret material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub client_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Freshly created credentials. The secret is not recoverable afterwards.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub client_id: String,
    pub client_secret: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Identity of a client whose secret was verified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub client_id: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    io_timeout: Duration,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_timeout: Duration::from_secs(2),
        }
    }

    /// Bound every disk operation by `timeout`
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks a client id / secret pair against the stored digest.
    ///
    /// An unreadable file counts as an empty store, so every client is rejected.
    pub async fn validate(&self, client_id: &str, client_secret: &str) -> Option<ClientIdentity> {
        let credentials = self.load().await;
        let client = credentials.iter().find(|c| c.client_id == client_id)?;

        let presented = hash_secret(client_secret);
        if !constant_time_eq(presented.as_bytes(), client.client_secret_hash.as_bytes()) {
            debug!("Secret mismatch for client '{}'", client_id);
            return None;
        }

        Some(ClientIdentity {
            client_id: client.client_id.clone(),
            name: client.name.clone(),
        })
    }

    /// Looks up a client without checking a secret
    pub async fn find(&self, client_id: &str) -> Option<ClientSummary> {
        self.load()
            .await
            .into_iter()
            .find(|c| c.client_id == client_id)
            .map(ClientSummary::from)
    }

    /// Generates a new client id and secret and persists the digest, stamped
    /// with `created_at`
    pub async fn create(
        &self,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<NewClient, CredentialError> {
        let mut credentials = self.try_load().await?;

        let client_id = format!("{}{}", CLIENT_ID_PREFIX, random_token(CLIENT_ID_BYTES));
        let client_secret = random_token(CLIENT_SECRET_BYTES);

        credentials.push(ClientCredential {
            client_id: client_id.clone(),
            client_secret_hash: hash_secret(&client_secret),
            name: name.to_string(),
            created_at,
        });
        self.save(&credentials).await?;

        info!("Created client '{}' ({})", client_id, name);

        Ok(NewClient {
            client_id,
            client_secret,
            name: name.to_string(),
            created_at,
        })
    }

    pub async fn list(&self) -> Result<Vec<ClientSummary>, CredentialError> {
        Ok(self
            .try_load()
            .await?
            .into_iter()
            .map(ClientSummary::from)
            .collect())
    }

    /// Removes the record. Returns `false` when no such client exists.
    ///
    /// This only touches the file. A running `AuthService` drops the client's
    /// in-memory state through `revoke_client`, or on its next refresh grant.
    pub async fn remove(&self, client_id: &str) -> Result<bool, CredentialError> {
        let mut credentials = self.try_load().await?;
        let before = credentials.len();
        credentials.retain(|c| c.client_id != client_id);

        if credentials.len() == before {
            return Ok(false);
        }

        self.save(&credentials).await?;
        info!("Removed client '{}' from {}", client_id, self.path.display());
        Ok(true)
    }

    /// Reads the record set, degrading to empty on any failure
    pub async fn load(&self) -> Vec<ClientCredential> {
        match self.try_load().await {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(
                    "Failed to read credentials from {}, treating as empty: {}",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Reads the record set. A missing file is an empty store; a corrupt or
    /// unreadable file is an error so that writers never clobber it.
    pub async fn try_load(&self) -> Result<Vec<ClientCredential>, CredentialError> {
        let read = self.bounded(tokio::fs::read_to_string(&self.path)).await?;
        let data = match read {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CredentialError::Io(e)),
        };

        if data.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&data).map_err(|e| CredentialError::Parse(e.to_string()))
    }

    async fn save(&self, credentials: &[ClientCredential]) -> Result<(), CredentialError> {
        let data = serde_json::to_string_pretty(credentials)
            .map_err(|e| CredentialError::Serialize(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.bounded(tokio::fs::create_dir_all(parent)).await??;
        }

        let tmp = self.path.with_extension("json.tmp");
        self.bounded(tokio::fs::write(&tmp, data)).await??;
        self.bounded(tokio::fs::rename(&tmp, &self.path)).await??;

        debug!(
            "Saved {} credential(s) to {}",
            credentials.len(),
            self.path.display()
        );
        Ok(())
    }

    async fn bounded<F, T>(&self, fut: F) -> Result<T, CredentialError>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout(self.io_timeout, fut)
            .await
            .map_err(|_| CredentialError::Timeout(self.io_timeout.as_millis()))
    }
}

impl From<ClientCredential> for ClientSummary {
    fn from(c: ClientCredential) -> Self {
        Self {
            client_id: c.client_id,
            name: c.name,
            created_at: c.created_at,
        }
    }
}
