// src/client/transport.rs
//! Authorized HTTP transport: credential attachment plus the one-shot
//! retry policy.
//!
//! Wraps `reqwest` so every outbound request carries the right
//! authorization header, harvests issued bearer tokens from successful
//! responses, and — on a 401 while a cached credential was in use — clears
//! the token, regenerates the identity proof, and retries exactly once. A
//! second failure is returned to the caller as-is.
//!
//! No cache mutation happens before a full response is observed, so a
//! request cancelled mid-flight leaves the credential cache unchanged.

use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::client::credential_manager::DidAuthClient;
use crate::errors::ClientError;

/// HTTP client composing [`DidAuthClient`] credentials into each request.
pub struct AuthorizedClient {
    http: reqwest::Client,
    credentials: Arc<DidAuthClient>,
}

impl AuthorizedClient {
    pub fn new(credentials: Arc<DidAuthClient>) -> Self {
        AuthorizedClient {
            http: reqwest::Client::new(),
            credentials,
        }
    }

    /// Executes a request against `url`, authenticating as needed.
    ///
    /// # Retry policy
    /// On a 401 the cached token is evicted, a fresh identity-proof header
    /// is generated, and the request is retried once. The retry's response
    /// is returned whatever its status; retries never amplify further.
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Response, ClientError> {
        let url = Self::normalize_url(url);
        let headers = self.credentials.get_auth_header(&url, false)?;

        log::info!("Request: {} {}", method, url);
        let response = self.send(method.clone(), &url, &headers, body).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            log::warn!("Authentication failed (401), retrying with a fresh identity proof");
            self.credentials.clear_token(&url);
            let headers = self.credentials.get_auth_header(&url, true)?;
            let retry = self.send(method, &url, &headers, body).await?;
            log::info!("Retry response: status code {}", retry.status());
            self.harvest_token(&url, &retry);
            return Ok(retry);
        }

        self.harvest_token(&url, &response);
        Ok(response)
    }

    /// Prefixes bare host/path targets with `http://`.
    fn normalize_url(url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("http://{url}")
        }
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: &HashMap<String, String>,
        body: Option<&Value>,
    ) -> Result<Response, ClientError> {
        let mut request = self.http.request(method, url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Stores a token returned on a successful response.
    fn harvest_token(&self, url: &str, response: &Response) {
        if !response.status().is_success() {
            return;
        }
        let Some(value) = response
            .headers()
            .get(reqwest::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
        else {
            return;
        };
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), value.to_string());
        if self.credentials.update_token(url, &headers).is_some() {
            log::info!("Stored bearer token issued by {}", url);
        }
    }
}
