// src/services/gatekeeper.rs
//! The server-side authentication gatekeeper.
//!
//! Runs once per inbound request and drives the request to one of two
//! terminal states: allowed (optionally with a freshly issued bearer token
//! to attach to the response) or rejected (with a status and detail).
//!
//! Check order: path exemption, domain validation, credential presence,
//! scheme classification, then the per-scheme verification path. On the
//! identity-proof path the cheap checks (timestamp freshness, nonce
//! consumption) run before the expensive ones (DID resolution, signature
//! verification), and the nonce is consumed atomically as part of its
//! presence check.

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::errors::AuthError;
use crate::models::auth_header::Credential;
use crate::services::nonce_ledger::NonceLedger;
use crate::services::resolver::DidResolver;
use crate::services::signature;
use crate::services::token::TokenIssuer;

/// Outcome of a successful authentication.
#[derive(Debug)]
pub struct AuthVerdict {
    /// Authenticated DID, when a credential was presented. Exempt paths
    /// carry no identity.
    pub did: Option<String>,
    /// Newly issued bearer token to attach to the response, if the request
    /// authenticated via an identity proof.
    pub token: Option<String>,
}

impl AuthVerdict {
    fn exempt() -> Self {
        AuthVerdict {
            did: None,
            token: None,
        }
    }
}

/// Orchestrates per-request authentication.
///
/// Owns the nonce ledger (the only shared mutable state on the request
/// path); the resolver and token issuer are injected so tests can swap
/// them.
pub struct AuthGatekeeper {
    config: AuthConfig,
    nonce_ledger: NonceLedger,
    token_issuer: TokenIssuer,
    resolver: Arc<dyn DidResolver>,
}

impl AuthGatekeeper {
    pub fn new(
        config: AuthConfig,
        token_issuer: TokenIssuer,
        resolver: Arc<dyn DidResolver>,
    ) -> Self {
        let nonce_ledger = NonceLedger::new(config.nonce_retention(), config.sweep_interval());
        AuthGatekeeper {
            config,
            nonce_ledger,
            token_issuer,
            resolver,
        }
    }

    /// Strips an optional port from a `Host` header value.
    fn domain_of(host: &str) -> &str {
        host.split(':').next().unwrap_or(host)
    }

    /// Runs the authentication state machine for one request.
    ///
    /// # Arguments
    /// * `path` - request path, used for the exemption check
    /// * `host` - the request's `Host` header value (port allowed)
    /// * `authorization` - the `Authorization` header value, if present
    ///
    /// # Returns
    /// An [`AuthVerdict`] when the request may proceed; an [`AuthError`]
    /// carrying the HTTP status otherwise.
    pub async fn authenticate(
        &self,
        path: &str,
        host: &str,
        authorization: Option<&str>,
    ) -> Result<AuthVerdict, AuthError> {
        if self.config.is_exempt(path) {
            log::info!("Path {} is exempt, skipping authentication", path);
            return Ok(AuthVerdict::exempt());
        }

        let domain = Self::domain_of(host);
        if !self.config.is_allowed_domain(domain) {
            log::error!("Domain {} not in allowed list", domain);
            return Err(AuthError::InvalidDomain);
        }

        let authorization = authorization.ok_or(AuthError::MissingCredential)?;

        match Credential::parse(authorization)? {
            Credential::DidWba(header) => {
                log::info!("Processing DID authentication for {}", header.did);
                let now = Utc::now();
                self.nonce_ledger.maybe_sweep(now);

                signature::verify_timestamp(
                    &header.timestamp,
                    now,
                    self.config.timestamp_window(),
                )?;

                // Consumption is the test-and-set itself: a pair is burned
                // the moment it first passes this check.
                if !self.nonce_ledger.record_if_new(&header.did, &header.nonce, now) {
                    return Err(AuthError::NonceReplayed);
                }

                let document = self.resolver.resolve(&header.did).await?;
                signature::verify_auth_header(&header, &document, domain)?;

                let token = self.token_issuer.issue(&header.did)?;
                Ok(AuthVerdict {
                    did: Some(header.did),
                    token: Some(token),
                })
            }
            Credential::Bearer(token) => {
                log::info!("Processing Bearer token authentication");
                let did = self.token_issuer.validate(&token)?;
                Ok(AuthVerdict {
                    did: Some(did),
                    token: None,
                })
            }
        }
    }
}

/// Axum middleware wrapping [`AuthGatekeeper::authenticate`].
///
/// On success the downstream handler runs; a token issued on the
/// identity-proof path is attached to the response `Authorization` header
/// so the client can cache it. On failure the request is answered with the
/// mapped status and a JSON `{"detail": …}` body.
pub async fn did_auth_middleware(
    State(gatekeeper): State<Arc<AuthGatekeeper>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().host().map(str::to_string))
        .unwrap_or_default();
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    match gatekeeper
        .authenticate(&path, &host, authorization.as_deref())
        .await
    {
        Ok(verdict) => {
            let mut response = next.run(request).await;
            if let Some(token) = verdict.token {
                match HeaderValue::from_str(&format!("Bearer {token}")) {
                    Ok(value) => {
                        response.headers_mut().insert(header::AUTHORIZATION, value);
                    }
                    Err(e) => log::error!("Issued token is not header-safe: {}", e),
                }
            }
            response
        }
        Err(err) => {
            log::error!(
                "Authentication failed: path={}, status={}, cause={}",
                path,
                err.status_code(),
                err
            );
            (err.status_code(), Json(json!({ "detail": err.detail() }))).into_response()
        }
    }
}
