// src/utils/crypto.rs
//! Cryptographic helpers shared by the client and server sides.
//!
//! Every signed payload in this system is hashed with SHA-256 before the
//! ECDSA operation, and signatures travel as unpadded base64url.

use rand::RngCore;
use ring::digest;

/// Computes a SHA-256 hash of the input data.
///
/// # Arguments
/// * `data` - Binary data to hash (as bytes slice)
///
/// # Returns
/// 32-byte digest as a `Vec<u8>`.
pub fn sha256(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA256, data).as_ref().to_vec()
}

/// Generates a fresh 16-byte nonce, hex-encoded.
///
/// Uses the thread-local CSPRNG. Each generated authentication header gets
/// its own nonce; the client never reuses one.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Encodes bytes as unpadded base64url (the signature wire encoding).
pub fn base64url_encode(data: &[u8]) -> String {
    base64::encode_config(data, base64::URL_SAFE_NO_PAD)
}

/// Decodes an unpadded base64url string.
pub fn base64url_decode(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::decode_config(value, base64::URL_SAFE_NO_PAD)
}
