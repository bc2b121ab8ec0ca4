// src/client/credential_manager.rs
//! Client-side credential cache: one entry per target domain.
//!
//! Each entry holds an identity-proof header and, once the server has
//! issued one, a bearer token. `get_auth_header` prefers the token;
//! `clear_token` (called after a 401) forces the next call back onto the
//! identity-proof path. The DID document and private key are loaded lazily
//! from their configured paths and reused for the life of the client.
//!
//! Cache reads and writes are serialized by a single lock over the domain
//! map; signing happens outside the lock, so two concurrent first requests
//! to the same domain may both generate a header. That is wasted work, not
//! a correctness hazard: each generated header carries its own nonce.

use chrono::{SecondsFormat, Utc};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::errors::ClientError;
use crate::models::auth_header::DidWbaHeader;
use crate::models::did::DIDDocument;
use crate::services::signature;
use crate::utils::crypto;
use crate::wallet::key_management::KeyManager;

/// Cached credentials for one target domain.
#[derive(Debug, Clone, Default)]
struct DomainCredential {
    auth_header: Option<String>,
    token: Option<String>,
}

/// Per-domain credential manager for outbound authenticated requests.
pub struct DidAuthClient {
    did_document_path: PathBuf,
    private_key_path: PathBuf,
    did_document: OnceCell<DIDDocument>,
    key_manager: OnceCell<KeyManager>,
    entries: Mutex<HashMap<String, DomainCredential>>,
}

impl DidAuthClient {
    /// Creates a client from the paths to its DID document and private key.
    ///
    /// Nothing is loaded until the first header is generated, so
    /// construction never fails.
    pub fn new(did_document_path: impl Into<PathBuf>, private_key_path: impl Into<PathBuf>) -> Self {
        DidAuthClient {
            did_document_path: did_document_path.into(),
            private_key_path: private_key_path.into(),
            did_document: OnceCell::new(),
            key_manager: OnceCell::new(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Extracts the domain from a server URL (scheme optional).
    fn domain_of(server_url: &str) -> Result<String, ClientError> {
        let candidate = if server_url.contains("://") {
            server_url.to_string()
        } else {
            format!("http://{server_url}")
        };
        let parsed = reqwest::Url::parse(&candidate)
            .map_err(|e| ClientError::Url(format!("{server_url}: {e}")))?;
        parsed
            .host_str()
            .map(str::to_string)
            .ok_or_else(|| ClientError::Url(format!("no host in {server_url}")))
    }

    fn document(&self) -> Result<&DIDDocument, ClientError> {
        self.did_document
            .get_or_try_init(|| DIDDocument::from_file(&self.did_document_path))
    }

    fn keys(&self) -> Result<&KeyManager, ClientError> {
        self.key_manager
            .get_or_try_init(|| KeyManager::from_pem_file(&self.private_key_path))
    }

    /// Generates a fresh identity-proof header for a domain.
    fn generate_auth_header(&self, domain: &str) -> Result<String, ClientError> {
        let document = self.document()?;
        let keys = self.keys()?;

        let method = document
            .verification_method
            .first()
            .ok_or_else(|| ClientError::Document("DID document has no verification method".into()))?;

        let nonce = crypto::generate_nonce();
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let payload = signature::signed_payload(&document.id, &nonce, domain, &timestamp);
        let signed = keys.sign(&payload)?;

        let header = DidWbaHeader {
            did: document.id.clone(),
            nonce,
            timestamp,
            verification_method: format!("#{}", method.fragment()),
            signature: crypto::base64url_encode(&signed),
        };

        log::info!("Generated authentication header for domain {}", domain);
        Ok(header.to_header_value())
    }

    /// Returns the headers to attach to a request for `server_url`.
    ///
    /// Prefers a cached bearer token; otherwise returns a cached or freshly
    /// generated identity-proof header. `force_new` bypasses both caches
    /// and regenerates the identity proof.
    pub fn get_auth_header(
        &self,
        server_url: &str,
        force_new: bool,
    ) -> Result<HashMap<String, String>, ClientError> {
        let domain = Self::domain_of(server_url)?;

        if !force_new {
            let entries = self.entries.lock().unwrap();
            if let Some(entry) = entries.get(&domain) {
                if let Some(token) = &entry.token {
                    log::info!("Using existing token for domain {}", domain);
                    return Ok(Self::authorization_map(format!("Bearer {token}")));
                }
                if let Some(header) = &entry.auth_header {
                    log::info!("Using cached DID authentication header for domain {}", domain);
                    return Ok(Self::authorization_map(header.clone()));
                }
            }
        }

        // Sign outside the lock; concurrent generation for the same domain
        // is tolerated (each header carries its own nonce).
        let header = self.generate_auth_header(&domain)?;
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(domain).or_default();
        entry.auth_header = Some(header.clone());
        Ok(Self::authorization_map(header))
    }

    /// Harvests a bearer token from response headers, if present.
    ///
    /// Stores and returns the token on a `Bearer` authorization value;
    /// leaves the cache untouched and returns `None` otherwise.
    pub fn update_token(
        &self,
        server_url: &str,
        response_headers: &HashMap<String, String>,
    ) -> Option<String> {
        let domain = Self::domain_of(server_url).ok()?;
        let value = response_headers
            .get("Authorization")
            .or_else(|| response_headers.get("authorization"))?;

        let prefix = value.get(..7)?;
        if !prefix.eq_ignore_ascii_case("bearer ") {
            log::debug!("No valid token found in response headers for domain {}", domain);
            return None;
        }
        let token = value[7..].trim().to_string();
        if token.is_empty() {
            return None;
        }

        let mut entries = self.entries.lock().unwrap();
        entries.entry(domain.clone()).or_default().token = Some(token.clone());
        log::info!("Updated token for domain {}", domain);
        Some(token)
    }

    /// Evicts the cached token for a domain (after a 401-class response).
    pub fn clear_token(&self, server_url: &str) {
        let Ok(domain) = Self::domain_of(server_url) else {
            return;
        };
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(&domain) {
            if entry.token.take().is_some() {
                log::info!("Cleared token for domain {}", domain);
            }
        }
    }

    /// Evicts every cached token, for all domains.
    pub fn clear_all_tokens(&self) {
        let mut entries = self.entries.lock().unwrap();
        for entry in entries.values_mut() {
            entry.token = None;
        }
        log::info!("Cleared all tokens for all domains");
    }

    fn authorization_map(value: String) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), value);
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_extraction_handles_schemes_ports_and_bare_hosts() {
        assert_eq!(
            DidAuthClient::domain_of("http://localhost:9870/a/b").unwrap(),
            "localhost"
        );
        assert_eq!(
            DidAuthClient::domain_of("https://api.example.com").unwrap(),
            "api.example.com"
        );
        assert_eq!(DidAuthClient::domain_of("x.com").unwrap(), "x.com");
    }

    #[test]
    fn update_token_ignores_non_bearer_values() {
        let client = DidAuthClient::new("unused.json", "unused.pem");
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), "DIDWba did=\"x\"".to_string());
        assert_eq!(client.update_token("http://x.com", &headers), None);

        headers.insert("Authorization".to_string(), "Bearer   ".to_string());
        assert_eq!(client.update_token("http://x.com", &headers), None);
    }
}
