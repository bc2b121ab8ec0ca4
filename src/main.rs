// src/main.rs

//! # DID-WBA Authentication Server - Main Entry Point
//!
//! Starts the demo server: every route is wrapped by the DID-WBA
//! authentication middleware, and a bearer token is attached to the
//! response after a successful identity-proof handshake.
//!
//! ## Configuration
//! Settings come from `wba_auth.toml` and `WBA_AUTH_*` environment
//! variables (see `config.rs`); `.env` is honored. The server needs an
//! RS256 keypair on disk for token signing:
//! - `WBA_AUTH_JWT_PRIVATE_KEY_PATH` (default `private_key.pem`)
//! - `WBA_AUTH_JWT_PUBLIC_KEY_PATH` (default `public_key.pem`)

use anyhow::Context;
use dotenv::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;

use did_wba_auth::services::api_server::ApiServer;
use did_wba_auth::{AuthConfig, AuthGatekeeper, HttpResolver, TokenIssuer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::init();

    let config = AuthConfig::load().context("failed to load configuration")?;

    let token_issuer = TokenIssuer::from_pem_files(
        &config.jwt_private_key_path,
        &config.jwt_public_key_path,
        config.token_ttl_seconds,
    )
    .context("failed to load JWT signing keys")?;

    let resolver = Arc::new(HttpResolver::new());

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address {}", config.bind_addr))?;

    let gatekeeper = AuthGatekeeper::new(config, token_issuer, resolver);
    let api_server = ApiServer::new(gatekeeper);

    log::info!("DID-WBA auth server running at http://{}", addr);
    log::info!("Available endpoints:");
    log::info!("- GET /wba/status            (exempt)");
    log::info!("- GET /wba/test401           (always 401)");
    log::info!("- GET /agents/example/ad.json (protected)");

    api_server.run(addr).await.context("server error")?;
    Ok(())
}
