//! Authentication module
//!
//! Bearer-token gate in front of the lookup API. Tokens are never stored:
//! the configuration lists SHA-256 digests of the accepted tokens and a
//! presented token is admitted when its digest is in that list.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Gate settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// When false every caller is admitted
    pub enabled: bool,
    /// Realm advertised in `WWW-Authenticate` challenges
    pub audience: String,
    /// Hex SHA-256 digests of accepted bearer tokens
    pub token_sha256: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            audience: "careershot".to_string(),
            token_sha256: Vec::new(),
        }
    }
}

/// Why a caller was turned away
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid bearer token")]
    InvalidToken,
}

/// Hash a token the way accepted digests are configured
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Admits or rejects callers before any lookup runs
#[derive(Debug, Clone)]
pub struct AccessGate {
    enabled: bool,
    audience: String,
    accepted: HashSet<String>,
}

impl AccessGate {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            enabled: config.enabled,
            audience: config.audience.clone(),
            accepted: config
                .token_sha256
                .iter()
                .map(|d| d.trim().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Check an `Authorization` header value
    pub fn authorize(&self, header: Option<&str>) -> Result<(), AuthError> {
        if !self.enabled {
            return Ok(());
        }

        let token = header
            .and_then(bearer_token)
            .ok_or(AuthError::MissingToken)?;

        if self.accepted.contains(&hash_token(token)) {
            Ok(())
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}

/// Extract the token from `Bearer <token>` (scheme is case-insensitive)
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
