// src/services/signature.rs
//! Verification of identity-proof signatures and timestamp freshness.
//!
//! The signed payload binds the client's DID, its one-time nonce, the
//! serving domain, and the generation timestamp:
//!
//! ```text
//! {"did":"…","nonce":"…","service":"<domain>","timestamp":"…"}
//! ```
//!
//! Keys serialize in sorted order (the `serde_json` map default), so both
//! sides produce identical bytes. The digest is SHA-256 and the signature
//! ECDSA over secp256k1. A signature made for one domain never verifies on
//! another because the domain is part of the payload.

use chrono::{DateTime, Duration, Utc};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::Signature;
use serde_json::json;

use crate::errors::AuthError;
use crate::models::auth_header::DidWbaHeader;
use crate::models::did::DIDDocument;
use crate::utils::crypto;

/// Builds the canonical domain-bound payload bytes.
pub fn signed_payload(did: &str, nonce: &str, service: &str, timestamp: &str) -> Vec<u8> {
    json!({
        "did": did,
        "nonce": nonce,
        "service": service,
        "timestamp": timestamp,
    })
    .to_string()
    .into_bytes()
}

/// Checks that a header timestamp is inside the freshness window.
///
/// Rejects timestamps in the future (no forward clock-skew tolerance) and
/// timestamps older than `window`. The boundary is inclusive: a timestamp
/// exactly `window` old is still accepted.
pub fn verify_timestamp(
    timestamp: &str,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<(), AuthError> {
    let parsed = DateTime::parse_from_rfc3339(timestamp)
        .map_err(|e| AuthError::MalformedCredential(format!("invalid timestamp: {e}")))?
        .with_timezone(&Utc);

    if parsed > now {
        log::error!("Timestamp is in the future: {}", timestamp);
        return Err(AuthError::FutureTimestamp);
    }
    if now - parsed > window {
        log::error!("Timestamp expired. Diff: {}", now - parsed);
        return Err(AuthError::ExpiredTimestamp);
    }
    Ok(())
}

/// Verifies the cryptographic binding of an identity-proof header to the
/// serving domain.
///
/// # Process Flow
/// 1. Resolve the signing key from the DID document by the header's
///    verification-method reference (unknown reference is a hard failure)
/// 2. Rebuild the canonical payload for this domain
/// 3. Verify the ECDSA signature over the payload digest
///
/// Timestamp freshness and nonce consumption are checked by the gatekeeper
/// before this runs; this function does only the expensive part.
pub fn verify_auth_header(
    header: &DidWbaHeader,
    document: &DIDDocument,
    domain: &str,
) -> Result<(), AuthError> {
    let method = document
        .find_verification_method(&header.verification_method)
        .ok_or_else(|| {
            log::error!(
                "Verification method {} not found in DID document {}",
                header.verification_method,
                document.id
            );
            AuthError::UnknownSigningKey(header.verification_method.clone())
        })?;

    let verifying_key = method.verifying_key()?;

    let payload = signed_payload(&header.did, &header.nonce, domain, &header.timestamp);
    let digest = crypto::sha256(&payload);

    let signature_bytes = crypto::base64url_decode(&header.signature).map_err(|e| {
        log::error!("Signature is not valid base64url: {}", e);
        AuthError::SignatureInvalid
    })?;
    let signature = Signature::from_slice(&signature_bytes).map_err(|e| {
        log::error!("Signature has invalid length or encoding: {}", e);
        AuthError::SignatureInvalid
    })?;

    verifying_key
        .verify_prehash(&digest, &signature)
        .map_err(|_| {
            log::error!(
                "Signature verification failed for DID {} on domain {}",
                header.did,
                domain
            );
            AuthError::SignatureInvalid
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::did::VerificationMethod;
    use crate::wallet::key_management::KeyManager;
    use chrono::SecondsFormat;

    fn test_identity() -> (KeyManager, DIDDocument) {
        let keys = KeyManager::generate();
        let did = "did:wba:client.example.com:user:alice".to_string();
        let document = DIDDocument {
            id: did.clone(),
            verification_method: vec![VerificationMethod {
                id: format!("{did}#key-1"),
                key_type: "EcdsaSecp256k1VerificationKey2019".to_string(),
                controller: did,
                public_key_hex: keys.public_key_hex(),
            }],
            authentication: vec![],
        };
        (keys, document)
    }

    fn signed_header(keys: &KeyManager, did: &str, domain: &str) -> DidWbaHeader {
        let nonce = crypto::generate_nonce();
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let payload = signed_payload(did, &nonce, domain, &timestamp);
        let signature = crypto::base64url_encode(&keys.sign(&payload).unwrap());
        DidWbaHeader {
            did: did.to_string(),
            nonce,
            timestamp,
            verification_method: "#key-1".to_string(),
            signature,
        }
    }

    #[test]
    fn valid_signature_verifies() {
        let (keys, document) = test_identity();
        let header = signed_header(&keys, &document.id, "a.example");
        assert_eq!(verify_auth_header(&header, &document, "a.example"), Ok(()));
    }

    #[test]
    fn signature_is_bound_to_the_domain() {
        let (keys, document) = test_identity();
        let header = signed_header(&keys, &document.id, "a.example");
        assert_eq!(
            verify_auth_header(&header, &document, "b.example"),
            Err(AuthError::SignatureInvalid)
        );
    }

    #[test]
    fn unknown_key_fragment_is_a_hard_failure() {
        let (keys, document) = test_identity();
        let mut header = signed_header(&keys, &document.id, "a.example");
        header.verification_method = "#key-9".to_string();
        assert!(matches!(
            verify_auth_header(&header, &document, "a.example"),
            Err(AuthError::UnknownSigningKey(_))
        ));
    }

    #[test]
    fn signature_from_another_key_is_rejected() {
        let (_, document) = test_identity();
        let other_keys = KeyManager::generate();
        let header = signed_header(&other_keys, &document.id, "a.example");
        assert_eq!(
            verify_auth_header(&header, &document, "a.example"),
            Err(AuthError::SignatureInvalid)
        );
    }

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-08-06T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn freshness_window_boundary_is_inclusive() {
        let window = Duration::minutes(5);
        let now = fixed_now();
        let fmt = |t: DateTime<Utc>| t.to_rfc3339_opts(SecondsFormat::Secs, true);

        // One second inside the window.
        let inside = fmt(now - Duration::minutes(5) + Duration::seconds(1));
        assert_eq!(verify_timestamp(&inside, now, window), Ok(()));

        // Exactly at the window: accepted (inclusive boundary).
        let boundary = fmt(now - Duration::minutes(5));
        assert_eq!(verify_timestamp(&boundary, now, window), Ok(()));

        // One second past the window.
        let expired = fmt(now - Duration::minutes(5) - Duration::seconds(1));
        assert_eq!(
            verify_timestamp(&expired, now, window),
            Err(AuthError::ExpiredTimestamp)
        );
    }

    #[test]
    fn future_timestamps_are_rejected() {
        let now = fixed_now();
        let future = (now + Duration::seconds(2)).to_rfc3339_opts(SecondsFormat::Secs, true);
        assert_eq!(
            verify_timestamp(&future, now, Duration::minutes(5)),
            Err(AuthError::FutureTimestamp)
        );
    }

    #[test]
    fn malformed_timestamps_fail_closed() {
        let now = Utc::now();
        assert!(matches!(
            verify_timestamp("not-a-timestamp", now, Duration::minutes(5)),
            Err(AuthError::MalformedCredential(_))
        ));
    }
}
