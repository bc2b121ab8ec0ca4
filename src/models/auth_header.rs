// src/models/auth_header.rs
//! Authorization header parsing for the two supported credential schemes.
//!
//! An inbound `Authorization` value is parsed exactly once into a tagged
//! [`Credential`], and everything downstream switches on the tag. Scheme
//! names are matched case-insensitively as whole schemes (name plus a
//! space), never as substrings.
//!
//! Identity-proof headers look like:
//!
//! ```text
//! DIDWba did="did:wba:example.com:user:alice", nonce="a1b2…", \
//!   timestamp="2026-08-06T12:00:00Z", verification_method="#key-1", \
//!   signature="base64url…"
//! ```

use crate::errors::AuthError;

/// Scheme name for identity-proof credentials.
pub const DID_WBA_SCHEME: &str = "DIDWba";

/// Scheme name for bearer-token credentials.
pub const BEARER_SCHEME: &str = "Bearer";

/// A parsed identity-proof header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DidWbaHeader {
    /// The asserted decentralized identifier
    pub did: String,
    /// Single-use challenge value (hex)
    pub nonce: String,
    /// RFC 3339 UTC instant the header was generated at
    pub timestamp: String,
    /// Reference to the signing key in the DID document
    pub verification_method: String,
    /// base64url ECDSA signature over the domain-bound payload
    pub signature: String,
}

impl DidWbaHeader {
    /// Serializes the header back into an `Authorization` value.
    pub fn to_header_value(&self) -> String {
        format!(
            "{} did=\"{}\", nonce=\"{}\", timestamp=\"{}\", verification_method=\"{}\", signature=\"{}\"",
            DID_WBA_SCHEME,
            self.did,
            self.nonce,
            self.timestamp,
            self.verification_method,
            self.signature
        )
    }

    fn parse_fields(fields: &str) -> Result<Self, AuthError> {
        let mut did = None;
        let mut nonce = None;
        let mut timestamp = None;
        let mut verification_method = None;
        let mut signature = None;

        // Field values (hex, base64url, RFC 3339, DID syntax) never contain
        // commas, so a plain split is unambiguous.
        for part in fields.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, raw) = part.split_once('=').ok_or_else(|| {
                AuthError::MalformedCredential(format!("field `{part}` is not key=value"))
            })?;
            let value = raw.trim().trim_matches('"').to_string();
            match key.trim() {
                "did" => did = Some(value),
                "nonce" => nonce = Some(value),
                "timestamp" => timestamp = Some(value),
                "verification_method" => verification_method = Some(value),
                "signature" => signature = Some(value),
                // Unknown fields are ignored for forward compatibility.
                _ => {}
            }
        }

        let require = |field: Option<String>, name: &str| {
            field
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AuthError::MalformedCredential(format!("missing field `{name}`")))
        };

        Ok(DidWbaHeader {
            did: require(did, "did")?,
            nonce: require(nonce, "nonce")?,
            timestamp: require(timestamp, "timestamp")?,
            verification_method: require(verification_method, "verification_method")?,
            signature: require(signature, "signature")?,
        })
    }
}

/// The classified form of an inbound `Authorization` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Identity-proof credential: the client proves key possession.
    DidWba(DidWbaHeader),
    /// Previously issued bearer token.
    Bearer(String),
}

impl Credential {
    /// Parses an `Authorization` value into its tagged form.
    ///
    /// # Errors
    /// - `UnsupportedScheme` if the scheme is neither `DIDWba` nor `Bearer`
    /// - `MalformedCredential` if the scheme is known but fields are missing
    pub fn parse(value: &str) -> Result<Self, AuthError> {
        let trimmed = value.trim();
        let (scheme, rest) = trimmed
            .split_once(char::is_whitespace)
            .ok_or(AuthError::UnsupportedScheme)?;

        if scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
            let token = rest.trim();
            if token.is_empty() {
                return Err(AuthError::MalformedCredential("empty bearer token".into()));
            }
            Ok(Credential::Bearer(token.to_string()))
        } else if scheme.eq_ignore_ascii_case(DID_WBA_SCHEME) {
            DidWbaHeader::parse_fields(rest).map(Credential::DidWba)
        } else {
            Err(AuthError::UnsupportedScheme)
        }
    }
}
