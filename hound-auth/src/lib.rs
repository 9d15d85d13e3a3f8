//! Authorization core of the hound gateway.
//!
//! [`AuthService`] owns client credentials (on disk), the in-memory access and
//! refresh token stores and the authorization code store, and implements the
//! `client_credentials`, `authorization_code` (with PKCE S256) and
//! `refresh_token` grants. [`SessionRegistry`] maps protocol session ids onto
//! their live transports.
//!
//! Expired state is not evicted by a timer. Every issuance sweeps all stores,
//! and every read re-checks expiry.

pub mod clock;
pub mod codes;
pub mod credentials;
pub mod crypto;
pub mod error;
pub mod grants;
pub mod pkce;
pub mod registration;
pub mod service;
pub mod session;
pub mod tokens;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codes::CodeRedemption;
pub use credentials::{
    ClientCredential, ClientIdentity, ClientSummary, CredentialStore, NewClient,
    DEFAULT_CREDENTIALS_FILE,
};
pub use error::{AuthError, CredentialError, SessionError};
pub use grants::{GrantRequest, TokenParams};
pub use pkce::PkceChallenge;
pub use registration::{ClientRegistration, ClientRegistrationRequest};
pub use service::{AuthService, AuthStats, Revocation};
pub use session::{
    SessionRegistry, SessionTransport, SseTransport, StreamableHttpTransport, TransportKind,
};
pub use tokens::{BearerIdentity, TokenLifetimes, TokenPair};
