// src/services/resolver.rs
//! DID document resolution.
//!
//! The core treats resolution as an external collaborator: given a
//! `did:wba` identifier, fetch its DID document over HTTP. The trait seam
//! lets tests substitute a stub resolver; production uses [`HttpResolver`].
//!
//! `did:wba` maps to a well-known URL:
//!
//! ```text
//! did:wba:example.com                  -> https://example.com/.well-known/did.json
//! did:wba:example.com:user:alice       -> https://example.com/user/alice/did.json
//! did:wba:localhost%3A9870:user:alice  -> http://localhost:9870/user/alice/did.json
//! ```
//!
//! Plain `http` is used only for localhost targets.

use async_trait::async_trait;

use crate::errors::AuthError;
use crate::models::did::DIDDocument;

/// Resolves a DID to its document.
#[async_trait]
pub trait DidResolver: Send + Sync {
    async fn resolve(&self, did: &str) -> Result<DIDDocument, AuthError>;
}

/// HTTP-backed resolver for `did:wba` identifiers.
pub struct HttpResolver {
    http: reqwest::Client,
}

impl HttpResolver {
    pub fn new() -> Self {
        HttpResolver {
            http: reqwest::Client::new(),
        }
    }

    /// Maps a `did:wba` identifier to the URL of its DID document.
    pub fn endpoint_for(did: &str) -> Result<String, AuthError> {
        let rest = did
            .strip_prefix("did:wba:")
            .ok_or_else(|| AuthError::MalformedCredential(format!("not a did:wba DID: {did}")))?;
        if rest.is_empty() {
            return Err(AuthError::MalformedCredential("empty did:wba body".into()));
        }

        let mut segments = rest.split(':');
        // Ports are percent-encoded in the method-specific id.
        let host = segments
            .next()
            .unwrap_or_default()
            .replace("%3A", ":")
            .replace("%3a", ":");
        let path_segments: Vec<&str> = segments.collect();

        let scheme = if host.starts_with("localhost") || host.starts_with("127.0.0.1") {
            "http"
        } else {
            "https"
        };

        let url = if path_segments.is_empty() {
            format!("{scheme}://{host}/.well-known/did.json")
        } else {
            format!("{scheme}://{host}/{}/did.json", path_segments.join("/"))
        };
        Ok(url)
    }
}

impl Default for HttpResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DidResolver for HttpResolver {
    async fn resolve(&self, did: &str) -> Result<DIDDocument, AuthError> {
        let url = Self::endpoint_for(did)?;
        log::debug!("Resolving DID {} via {}", did, url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AuthError::ResolverUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::ResolverUnavailable(format!(
                "resolver returned {} for {}",
                response.status(),
                url
            )));
        }

        response
            .json::<DIDDocument>()
            .await
            .map_err(|e| AuthError::ResolverUnavailable(format!("invalid DID document: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_maps_to_well_known() {
        assert_eq!(
            HttpResolver::endpoint_for("did:wba:example.com").unwrap(),
            "https://example.com/.well-known/did.json"
        );
    }

    #[test]
    fn path_segments_map_to_a_document_path() {
        assert_eq!(
            HttpResolver::endpoint_for("did:wba:example.com:user:alice").unwrap(),
            "https://example.com/user/alice/did.json"
        );
    }

    #[test]
    fn localhost_uses_plain_http_and_decodes_the_port() {
        assert_eq!(
            HttpResolver::endpoint_for("did:wba:localhost%3A9870:user:alice").unwrap(),
            "http://localhost:9870/user/alice/did.json"
        );
        assert_eq!(
            HttpResolver::endpoint_for("did:wba:127.0.0.1%3A8000").unwrap(),
            "http://127.0.0.1:8000/.well-known/did.json"
        );
    }

    #[test]
    fn non_wba_dids_are_rejected() {
        assert!(HttpResolver::endpoint_for("did:key:z6Mk").is_err());
        assert!(HttpResolver::endpoint_for("did:wba:").is_err());
    }
}
