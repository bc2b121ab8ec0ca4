// src/services/api_server.rs
//! Demo API server wired with the DID-WBA authentication middleware.
//!
//! Exposes a protected agent-descriptor endpoint plus two endpoints used by
//! clients to probe the handshake:
//! - `/wba/status` (exempt): liveness, no credential required
//! - `/wba/test401` (exempt from auth, always 401): exercises the client's
//!   token-eviction and retry path

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::services::gatekeeper::{did_auth_middleware, AuthGatekeeper};

/// Demo HTTP server owning the authentication gatekeeper.
pub struct ApiServer {
    gatekeeper: Arc<AuthGatekeeper>,
}

impl ApiServer {
    pub fn new(gatekeeper: AuthGatekeeper) -> Self {
        ApiServer {
            gatekeeper: Arc::new(gatekeeper),
        }
    }

    /// Builds the router with the authentication middleware applied to every
    /// route. Exemption decisions live in configuration, not in routing.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/wba/status", get(Self::status_handler))
            .route("/wba/test401", get(Self::test401_handler))
            .route("/agents/example/ad.json", get(Self::agent_descriptor_handler))
            .layer(middleware::from_fn_with_state(
                Arc::clone(&self.gatekeeper),
                did_auth_middleware,
            ))
    }

    /// Starts the server and begins listening for requests.
    pub async fn run(&self, addr: SocketAddr) -> std::io::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await
    }

    /// Liveness endpoint; exempt from authentication by default config.
    async fn status_handler() -> impl IntoResponse {
        Json(json!({ "status": "ok" }))
    }

    /// Always answers 401. Clients hit this to verify their token-eviction
    /// and one-shot retry behavior.
    async fn test401_handler() -> impl IntoResponse {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid token" })),
        )
    }

    /// A protected sample resource, reachable only through the gatekeeper.
    async fn agent_descriptor_handler() -> impl IntoResponse {
        Json(json!({
            "name": "Example Agent",
            "description": "Sample agent descriptor served behind DID-WBA authentication",
            "version": "1.0.0",
        }))
    }
}
