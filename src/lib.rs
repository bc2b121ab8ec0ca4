// src/lib.rs
//! # DID-WBA Authentication System
//!
//! Decentralized-identity authentication over HTTP: a client proves
//! possession of the private key behind its DID by sending a signed,
//! domain-bound, single-use header; the server verifies the proof exactly
//! once, guards against replay with a nonce ledger, and exchanges it for a
//! short-lived bearer token the client caches for subsequent requests.
//!
//! ## Architecture Overview
//! 1. **Server side**: `AuthGatekeeper` middleware drives each request
//!    through exemption, domain, freshness, nonce, signature, and token
//!    checks
//! 2. **Client side**: `DidAuthClient` caches credentials per domain and
//!    `AuthorizedClient` applies the one-shot retry policy
//! 3. **Cryptography**: secp256k1 identity proofs, RS256 bearer tokens

// Module declarations (organized by functional domain)
pub mod client; // Client-side credential cache and transport
pub mod config; // Configuration surface
pub mod errors; // Error taxonomy and status mapping
pub mod models; // Data structures (DID documents, auth headers)
pub mod services; // Server-side authentication components
pub mod utils; // Helper functions
pub mod wallet; // Cryptographic key operations

pub use client::credential_manager::DidAuthClient;
pub use client::transport::AuthorizedClient;
pub use config::AuthConfig;
pub use errors::{AuthError, ClientError};
pub use models::auth_header::{Credential, DidWbaHeader};
pub use models::did::{DIDDocument, VerificationMethod};
pub use services::gatekeeper::{AuthGatekeeper, AuthVerdict};
pub use services::nonce_ledger::NonceLedger;
pub use services::resolver::{DidResolver, HttpResolver};
pub use services::token::TokenIssuer;
