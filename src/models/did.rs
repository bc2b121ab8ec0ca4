// src/models/did.rs
//! Decentralized Identifier (DID) data model implementation.
//!
//! Defines the subset of a W3C DID Document this system consumes: the
//! identifier and its verification methods. Documents are resolved once per
//! identity-proof verification and then discarded; nothing here caches.

use k256::ecdsa::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{AuthError, ClientError};

/// A single verification key entry inside a DID Document.
///
/// The `public_key_hex` field carries the SEC1-encoded secp256k1 public key
/// (uncompressed, `04 || X || Y`) as lowercase hex.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// Full method id, e.g. `did:wba:example.com:user:alice#key-1`
    pub id: String,

    /// Key suite name, e.g. `EcdsaSecp256k1VerificationKey2019`
    #[serde(rename = "type")]
    pub key_type: String,

    /// DID that controls this key
    pub controller: String,

    /// SEC1 public key bytes, hex-encoded
    pub public_key_hex: String,
}

impl VerificationMethod {
    /// Fragment part of the method id (`key-1` for `…#key-1`).
    pub fn fragment(&self) -> &str {
        self.id.rsplit('#').next().unwrap_or(&self.id)
    }

    /// Decodes the hex public key into a verifying key.
    ///
    /// Fails closed: any decoding problem is a verification failure, never
    /// silently ignored.
    pub fn verifying_key(&self) -> Result<VerifyingKey, AuthError> {
        let bytes = hex::decode(&self.public_key_hex).map_err(|e| {
            log::error!("Invalid public key hex in {}: {}", self.id, e);
            AuthError::SignatureInvalid
        })?;
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|e| {
            log::error!("Invalid SEC1 public key in {}: {}", self.id, e);
            AuthError::SignatureInvalid
        })
    }
}

/// A DID Document: the resolved public verification material for a DID.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DIDDocument {
    /// The complete DID string identifier
    /// Example: "did:wba:example.com:user:alice"
    pub id: String,

    /// Verification keys published for this DID
    #[serde(default)]
    pub verification_method: Vec<VerificationMethod>,

    /// References to the methods usable for authentication
    #[serde(default)]
    pub authentication: Vec<String>,
}

impl DIDDocument {
    /// Looks up a verification method by reference.
    ///
    /// Accepts a full method id, a `#fragment`, or a bare fragment; an
    /// unknown reference means the signing key cannot be resolved.
    pub fn find_verification_method(&self, reference: &str) -> Option<&VerificationMethod> {
        let wanted = reference.rsplit('#').next().unwrap_or(reference);
        self.verification_method
            .iter()
            .find(|vm| vm.id == reference || vm.fragment() == wanted)
    }

    /// Loads a DID document from a JSON file (client side).
    pub fn from_file(path: &Path) -> Result<Self, ClientError> {
        let raw = fs::read_to_string(path).map_err(|source| ClientError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|e| ClientError::Document(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> DIDDocument {
        serde_json::from_value(serde_json::json!({
            "id": "did:wba:example.com:user:alice",
            "verificationMethod": [{
                "id": "did:wba:example.com:user:alice#key-1",
                "type": "EcdsaSecp256k1VerificationKey2019",
                "controller": "did:wba:example.com:user:alice",
                "publicKeyHex": "00"
            }]
        }))
        .unwrap()
    }

    #[test]
    fn method_lookup_accepts_all_reference_forms() {
        let doc = sample_document();
        assert!(doc
            .find_verification_method("did:wba:example.com:user:alice#key-1")
            .is_some());
        assert!(doc.find_verification_method("#key-1").is_some());
        assert!(doc.find_verification_method("key-1").is_some());
        assert!(doc.find_verification_method("#key-2").is_none());
    }

    #[test]
    fn bad_key_material_fails_closed() {
        let doc = sample_document();
        let vm = doc.find_verification_method("#key-1").unwrap();
        assert!(matches!(
            vm.verifying_key(),
            Err(AuthError::SignatureInvalid)
        ));
    }
}
