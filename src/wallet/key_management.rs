// src/wallet/key_management.rs
//! Cryptographic key management for the client identity.
//!
//! Loads the DID's secp256k1 private key from a PEM file (SEC1 or PKCS#8)
//! and signs domain-bound payloads with ECDSA over a SHA-256 prehash.
//! Fresh keys can also be generated, which the tests use to build throwaway
//! identities.

use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::pkcs8::DecodePrivateKey;
use k256::SecretKey;
use std::fs;
use std::path::Path;

use crate::errors::ClientError;
use crate::utils::crypto;

/// Holder of the client's signing key material.
///
/// # Security Notes
/// - The secret key is never exposed publicly
/// - Signing uses deterministic ECDSA (RFC 6979)
#[derive(Clone)]
pub struct KeyManager {
    /// Securely stored private key (never exposed)
    signing_key: SigningKey,
    /// Derived public key for verification
    pub verifying_key: VerifyingKey,
}

impl KeyManager {
    /// Generates a KeyManager with a fresh random secp256k1 key.
    pub fn generate() -> Self {
        let secret_key = SecretKey::random(&mut rand::thread_rng());
        Self::from_secret(secret_key)
    }

    /// Loads a private key from a PEM file.
    ///
    /// Accepts SEC1 (`EC PRIVATE KEY`) and PKCS#8 (`PRIVATE KEY`) encodings,
    /// the two formats the original tooling produces.
    pub fn from_pem_file(path: &Path) -> Result<Self, ClientError> {
        let pem = fs::read_to_string(path).map_err(|source| ClientError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_pem(&pem)
    }

    /// Parses a private key from PEM text.
    pub fn from_pem(pem: &str) -> Result<Self, ClientError> {
        let secret_key = match SecretKey::from_sec1_pem(pem) {
            Ok(key) => key,
            Err(_) => SecretKey::from_pkcs8_pem(pem)
                .map_err(|e| ClientError::Key(format!("not SEC1 or PKCS#8 PEM: {e}")))?,
        };
        Ok(Self::from_secret(secret_key))
    }

    fn from_secret(secret_key: SecretKey) -> Self {
        let signing_key = SigningKey::from(&secret_key);
        let verifying_key = *signing_key.verifying_key();
        KeyManager {
            signing_key,
            verifying_key,
        }
    }

    /// Signs a message: SHA-256 prehash, then ECDSA (secp256k1).
    ///
    /// # Returns
    /// 64-byte compact signature (`R || S`).
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, ClientError> {
        let digest = crypto::sha256(message);
        let signature: Signature = self
            .signing_key
            .sign_prehash(&digest)
            .map_err(|e| ClientError::Key(format!("signing failed: {e}")))?;
        Ok(signature.to_vec())
    }

    /// SEC1 uncompressed public key, hex-encoded (as published in DID
    /// documents).
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key.to_encoded_point(false).as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::signature::hazmat::PrehashVerifier;

    #[test]
    fn generated_key_signs_verifiably() {
        let keys = KeyManager::generate();
        let message = b"payload to bind";
        let signature_bytes = keys.sign(message).unwrap();
        assert_eq!(signature_bytes.len(), 64);

        let signature = Signature::from_slice(&signature_bytes).unwrap();
        let digest = crypto::sha256(message);
        assert!(keys.verifying_key.verify_prehash(&digest, &signature).is_ok());
    }

    #[test]
    fn public_key_hex_is_uncompressed_sec1() {
        let keys = KeyManager::generate();
        let encoded = keys.public_key_hex();
        assert_eq!(encoded.len(), 130);
        assert!(encoded.starts_with("04"));
    }

    #[test]
    fn garbage_pem_is_rejected() {
        assert!(KeyManager::from_pem("-----BEGIN GARBAGE-----\nAA==\n-----END GARBAGE-----\n").is_err());
    }
}
