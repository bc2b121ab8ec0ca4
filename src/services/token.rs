// src/services/token.rs
//! Bearer token issuance and validation.
//!
//! Tokens are RS256 JWTs with `{sub, iat, exp}` claims, minted only after a
//! successful identity-proof verification. Validity is self-contained
//! (signature plus expiry); no server-side lookup. Tokens are not
//! renewable: expiry forces the client back to the identity-proof path.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::errors::AuthError;

/// JWT claim set for issued bearer tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated DID
    pub sub: String,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
}

/// Mints and validates short-lived bearer tokens bound to a DID.
///
/// The signing key pair is long-lived and provisioned out of band (PEM
/// files on disk); the token TTL comes from configuration.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    /// Builds an issuer from RSA PEM byte slices.
    pub fn from_pems(
        private_pem: &[u8],
        public_pem: &[u8],
        ttl_seconds: i64,
    ) -> Result<Self, AuthError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_pem)
            .map_err(|e| AuthError::Internal(format!("invalid JWT private key: {e}")))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem)
            .map_err(|e| AuthError::Internal(format!("invalid JWT public key: {e}")))?;
        Ok(TokenIssuer {
            encoding_key,
            decoding_key,
            ttl: Duration::seconds(ttl_seconds),
        })
    }

    /// Builds an issuer from RSA PEM files on disk.
    pub fn from_pem_files(
        private_key_path: &str,
        public_key_path: &str,
        ttl_seconds: i64,
    ) -> Result<Self, AuthError> {
        let private_pem = fs::read(private_key_path).map_err(|e| {
            AuthError::Internal(format!("cannot read JWT private key {private_key_path}: {e}"))
        })?;
        let public_pem = fs::read(public_key_path).map_err(|e| {
            AuthError::Internal(format!("cannot read JWT public key {public_key_path}: {e}"))
        })?;
        Self::from_pems(&private_pem, &public_pem, ttl_seconds)
    }

    /// Issues a token for a DID, valid from now for the configured TTL.
    pub fn issue(&self, did: &str) -> Result<String, AuthError> {
        self.issue_at(did, Utc::now())
    }

    /// Issues a token with an explicit issue instant.
    ///
    /// Expiry boundaries are exercised in tests by back-dating this instant.
    pub fn issue_at(&self, did: &str, issued_at: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            sub: did.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))?;
        log::info!("Generated JWT token for DID: {}", did);
        Ok(token)
    }

    /// Validates a bearer token and returns the authenticated DID.
    ///
    /// # Errors
    /// - `TokenExpired` for a structurally valid token past its expiry
    /// - `TokenMalformed` for everything else (bad signature, wrong
    ///   algorithm, missing claims, garbage input)
    pub fn validate(&self, token: &str) -> Result<String, AuthError> {
        // No leeway: a token is invalid the second it expires.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims.sub),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
                log::error!("Token has expired");
                Err(AuthError::TokenExpired)
            }
            Err(e) => {
                log::error!("Invalid token: {}", e);
                Err(AuthError::TokenMalformed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_PEM: &[u8] = include_bytes!("../../tests/fixtures/jwt_private.pem");
    const PUBLIC_PEM: &[u8] = include_bytes!("../../tests/fixtures/jwt_public.pem");

    fn issuer() -> TokenIssuer {
        TokenIssuer::from_pems(PRIVATE_PEM, PUBLIC_PEM, 300).unwrap()
    }

    #[test]
    fn issued_token_validates_to_its_subject() {
        let issuer = issuer();
        let token = issuer.issue("did:wba:example.com:user:alice").unwrap();
        assert_eq!(
            issuer.validate(&token).unwrap(),
            "did:wba:example.com:user:alice"
        );
    }

    #[test]
    fn token_expires_after_exactly_its_ttl() {
        let issuer = issuer();

        // Issued 299 seconds ago with a 300 second TTL: still valid.
        let token = issuer
            .issue_at("did:wba:a", Utc::now() - Duration::seconds(299))
            .unwrap();
        assert!(issuer.validate(&token).is_ok());

        // Issued 301 seconds ago: expired, and reported as such.
        let token = issuer
            .issue_at("did:wba:a", Utc::now() - Duration::seconds(301))
            .unwrap();
        assert_eq!(issuer.validate(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn garbage_tokens_are_malformed_not_expired() {
        let issuer = issuer();
        assert_eq!(
            issuer.validate("not.a.token"),
            Err(AuthError::TokenMalformed)
        );
        assert_eq!(issuer.validate(""), Err(AuthError::TokenMalformed));
    }

    #[test]
    fn tampered_token_is_rejected_as_malformed() {
        let issuer = issuer();
        let token = issuer.issue("did:wba:a").unwrap();

        // Corrupt the signature section.
        let mut parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        let corrupted = if parts[2].starts_with('A') { "B" } else { "A" };
        let replacement = format!("{}{}", corrupted, &parts[2][1..]);
        parts[2] = &replacement;
        let tampered = parts.join(".");

        assert_eq!(issuer.validate(&tampered), Err(AuthError::TokenMalformed));
    }
}
