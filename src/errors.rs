// src/errors.rs
//! Error types for the DID-WBA authentication system.
//!
//! Server-side failures are modeled as [`AuthError`], with one variant per
//! rejection cause so the gatekeeper can map each to exactly one HTTP
//! status. Client-side failures (key loading, header generation, transport)
//! use [`ClientError`] and are surfaced to the caller as hard failures.

use axum::http::StatusCode;
use thiserror::Error;

/// Authentication failure raised anywhere in the server gatekeeper path.
///
/// Each variant maps to exactly one HTTP status class:
/// - 400: domain/routing problems
/// - 401: missing, malformed, stale, or replayed credentials
/// - 403: signature and token-authenticity failures
/// - 500: internal faults (key storage, resolver transport)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authorization header missing")]
    MissingCredential,

    #[error("Unsupported authorization type")]
    UnsupportedScheme,

    #[error("Invalid domain for DID operation")]
    InvalidDomain,

    #[error("Malformed credential: {0}")]
    MalformedCredential(String),

    #[error("Timestamp expired")]
    ExpiredTimestamp,

    #[error("Timestamp is in the future")]
    FutureTimestamp,

    #[error("Nonce has already been used")]
    NonceReplayed,

    #[error("Unknown signing key: {0}")]
    UnknownSigningKey(String),

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    TokenMalformed,

    #[error("DID resolution failed: {0}")]
    ResolverUnavailable(String),

    #[error("Internal authentication error: {0}")]
    Internal(String),
}

impl AuthError {
    /// HTTP status the gatekeeper answers with for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidDomain => StatusCode::BAD_REQUEST,
            AuthError::MissingCredential
            | AuthError::UnsupportedScheme
            | AuthError::MalformedCredential(_)
            | AuthError::ExpiredTimestamp
            | AuthError::FutureTimestamp
            | AuthError::NonceReplayed
            | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::UnknownSigningKey(_)
            | AuthError::SignatureInvalid
            | AuthError::TokenMalformed => StatusCode::FORBIDDEN,
            AuthError::ResolverUnavailable(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing detail string for the rejection body.
    ///
    /// Internal faults collapse to a generic message; their cause is logged
    /// server-side only.
    pub fn detail(&self) -> String {
        match self {
            AuthError::ResolverUnavailable(_) | AuthError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Failure on the client side of the handshake.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid private key: {0}")]
    Key(String),

    #[error("Invalid DID document: {0}")]
    Document(String),

    #[error("Invalid server URL: {0}")]
    Url(String),

    #[error("Invalid request header: {0}")]
    Header(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_the_taxonomy() {
        assert_eq!(AuthError::InvalidDomain.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::MissingCredential.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::NonceReplayed.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::SignatureInvalid.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::TokenMalformed.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::ResolverUnavailable("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_detail_does_not_leak() {
        let err = AuthError::Internal("jwt signing key unreadable at /etc/keys".into());
        assert_eq!(err.detail(), "Internal server error");
        let err = AuthError::ResolverUnavailable("connection refused".into());
        assert_eq!(err.detail(), "Internal server error");
    }
}
