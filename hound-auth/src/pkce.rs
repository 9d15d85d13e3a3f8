//! PKCE (RFC 7636) challenge handling. Only `S256` is recognised.

use crate::crypto::{constant_time_eq, sha256_base64url};
use serde::{Deserialize, Serialize};

pub const S256: &str = "S256";

/// Challenge recorded alongside an authorization code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkceChallenge {
    pub challenge: String,
    pub method: Option<String>,
}

impl PkceChallenge {
    pub fn new(challenge: impl Into<String>, method: Option<String>) -> Self {
        Self {
            challenge: challenge.into(),
            method,
        }
    }

    /// Whether redemption must present a verifier. A challenge recorded with
    /// any method other than S256 is kept but never enforced.
    pub fn is_enforced(&self) -> bool {
        self.method.as_deref() == Some(S256)
    }

    /// Checks `verifier` against the stored S256 challenge
    pub fn verify(&self, verifier: &str) -> bool {
        let computed = sha256_base64url(verifier);
        constant_time_eq(computed.as_bytes(), self.challenge.as_bytes())
    }
}

/// Derive the S256 challenge for a verifier
pub fn s256_challenge(verifier: &str) -> String {
    sha256_base64url(verifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7636 appendix B
    const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[test]
    fn test_s256_challenge_matches_rfc_vector() {
        assert_eq!(s256_challenge(VERIFIER), CHALLENGE);
    }

    #[test]
    fn test_verify() {
        let pkce = PkceChallenge::new(CHALLENGE, Some(S256.to_string()));
        assert!(pkce.is_enforced());
        assert!(pkce.verify(VERIFIER));
        assert!(!pkce.verify("wrong_verifier"));
        assert!(!pkce.verify(CHALLENGE));
    }

    #[test]
    fn test_unknown_method_is_not_enforced() {
        let plain = PkceChallenge::new("abc", Some("plain".to_string()));
        assert!(!plain.is_enforced());
        let missing = PkceChallenge::new("abc", None);
        assert!(!missing.is_enforced());
    }
}
