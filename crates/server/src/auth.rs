// Bearer key authentication
// Decision: Keys are held as SHA-256 digests, never in plain text
// Decision: An empty allow-list means auth is disabled (local development)
// Decision: Checked inside handlers, after request validation, so bad input is a 400 regardless of credentials

use std::collections::HashSet;

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Authentication error
#[derive(Debug, Clone, Serialize)]
pub struct AuthError {
    pub error: String,
    pub kind: &'static str,
    #[serde(skip)]
    pub status: StatusCode,
}

impl AuthError {
    pub fn unauthorized(message: &str) -> Self {
        Self {
            error: message.to_string(),
            kind: "auth",
            status: StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Hash a key for allow-list storage and lookup
pub fn hash_api_key(key: &str) -> String {
    let hash = Sha256::digest(key.as_bytes());
    hex::encode(hash)
}

/// Static allow-list of accepted bearer keys
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    digests: HashSet<String>,
}

impl ApiKeys {
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let digests = keys
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .map(|k| hash_api_key(&k))
            .collect();
        Self { digests }
    }

    /// Allow-list that accepts every request
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        !self.digests.is_empty()
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Check the request's `Authorization: Bearer <key>` header
    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        if !self.is_enabled() {
            return Ok(());
        }

        let auth_header = headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AuthError::unauthorized("Authentication required"))?;
        let auth_str = auth_header
            .to_str()
            .map_err(|_| AuthError::unauthorized("Invalid authorization header"))?;
        let key = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AuthError::unauthorized("Bearer token required"))?;

        if self.digests.contains(&hash_api_key(key)) {
            Ok(())
        } else {
            tracing::debug!("Rejected unknown API key");
            Err(AuthError::unauthorized("Invalid API key"))
        }
    }
}
