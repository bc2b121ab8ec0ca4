// src/config.rs
//! Configuration surface for the DID-WBA authentication system.
//!
//! Settings are layered: serde defaults, then an optional `wba_auth.toml`
//! file, then `WBA_AUTH_*` environment variables. The defaults mirror the
//! protocol constants (5 minute timestamp window, 6 minute nonce retention,
//! 60 second sweep interval, 300 second token TTL).

use chrono::Duration;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

fn default_server_domains() -> Vec<String> {
    vec!["localhost".to_string(), "127.0.0.1".to_string()]
}

fn default_exempt_paths() -> Vec<String> {
    vec![
        "/openapi.yaml".to_string(),
        "/logo.png".to_string(),
        "/legal".to_string(),
        "/ai-plugin.json".to_string(),
        "/wba/status".to_string(),
        "/wba/test401".to_string(),
    ]
}

fn default_timestamp_expiration_minutes() -> i64 {
    5
}

fn default_nonce_expiration_minutes() -> i64 {
    6
}

fn default_cleanup_interval_seconds() -> i64 {
    60
}

fn default_token_ttl_seconds() -> i64 {
    300
}

fn default_jwt_private_key_path() -> String {
    "private_key.pem".to_string()
}

fn default_jwt_public_key_path() -> String {
    "public_key.pem".to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:9870".to_string()
}

/// Runtime configuration for the server-side authentication components.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Host names this server will accept DID operations for.
    #[serde(default = "default_server_domains")]
    pub wba_server_domains: Vec<String>,

    /// Request paths that bypass authentication entirely.
    #[serde(default = "default_exempt_paths")]
    pub exempt_paths: Vec<String>,

    /// Freshness window for identity-proof timestamps, in minutes.
    #[serde(default = "default_timestamp_expiration_minutes")]
    pub timestamp_expiration_minutes: i64,

    /// Retention window for consumed nonces, in minutes. Must exceed the
    /// timestamp freshness window so a nonce cannot be replayed after its
    /// timestamp window closes.
    #[serde(default = "default_nonce_expiration_minutes")]
    pub nonce_expiration_minutes: i64,

    /// Minimum seconds between opportunistic nonce-ledger sweeps.
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: i64,

    /// Lifetime of issued bearer tokens, in seconds. Non-renewable.
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: i64,

    /// Path to the RS256 token-signing private key (PEM).
    #[serde(default = "default_jwt_private_key_path")]
    pub jwt_private_key_path: String,

    /// Path to the RS256 token-verification public key (PEM).
    #[serde(default = "default_jwt_public_key_path")]
    pub jwt_public_key_path: String,

    /// Socket address the demo server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            wba_server_domains: default_server_domains(),
            exempt_paths: default_exempt_paths(),
            timestamp_expiration_minutes: default_timestamp_expiration_minutes(),
            nonce_expiration_minutes: default_nonce_expiration_minutes(),
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
            token_ttl_seconds: default_token_ttl_seconds(),
            jwt_private_key_path: default_jwt_private_key_path(),
            jwt_public_key_path: default_jwt_public_key_path(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl AuthConfig {
    /// Loads configuration from `wba_auth.toml` (optional) and `WBA_AUTH_*`
    /// environment variables, then validates it.
    ///
    /// # Errors
    /// Returns `ConfigError` if a source fails to parse or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("wba_auth").required(false))
            .add_source(Environment::with_prefix("WBA_AUTH").try_parsing(true))
            .build()?;

        let config: AuthConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field invariants.
    ///
    /// The nonce retention window must be strictly longer than the timestamp
    /// freshness window; otherwise a nonce slot could free while its
    /// timestamp is still acceptable, reopening the replay window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nonce_expiration_minutes <= self.timestamp_expiration_minutes {
            return Err(ConfigError::Message(format!(
                "nonce_expiration_minutes ({}) must exceed timestamp_expiration_minutes ({})",
                self.nonce_expiration_minutes, self.timestamp_expiration_minutes
            )));
        }
        if self.token_ttl_seconds <= 0 {
            return Err(ConfigError::Message(
                "token_ttl_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timestamp_window(&self) -> Duration {
        Duration::minutes(self.timestamp_expiration_minutes)
    }

    pub fn nonce_retention(&self) -> Duration {
        Duration::minutes(self.nonce_expiration_minutes)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::seconds(self.cleanup_interval_seconds)
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.iter().any(|p| p == path)
    }

    pub fn is_allowed_domain(&self, domain: &str) -> bool {
        self.wba_server_domains.iter().any(|d| d == domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let config = AuthConfig::default();
        assert_eq!(config.timestamp_expiration_minutes, 5);
        assert_eq!(config.nonce_expiration_minutes, 6);
        assert_eq!(config.cleanup_interval_seconds, 60);
        assert_eq!(config.token_ttl_seconds, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn retention_must_exceed_freshness_window() {
        let config = AuthConfig {
            nonce_expiration_minutes: 5,
            ..AuthConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn exemption_and_domain_checks_are_exact_matches() {
        let config = AuthConfig::default();
        assert!(config.is_exempt("/wba/test401"));
        assert!(!config.is_exempt("/wba/test401/extra"));
        assert!(config.is_allowed_domain("localhost"));
        assert!(!config.is_allowed_domain("evil.example.com"));
    }
}
