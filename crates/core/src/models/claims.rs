//! Bearer token claims
//!
//! The token is a JWT-shaped string whose payload segment is readable
//! without the signing key. The client decodes it purely as a UX hint
//! (name pre-fill, user id for requests); authorization stays with the
//! server on every request.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Claims embedded in a bearer token. Unverified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the server-assigned user id
    #[serde(alias = "userId", alias = "_id", alias = "id")]
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Issued-at, seconds since the epoch
    #[serde(default)]
    pub iat: Option<i64>,
    /// Expiry, seconds since the epoch
    #[serde(default)]
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Decode the payload segment of a JWT-shaped token.
    ///
    /// Fails soft: any malformed input (wrong segment count, bad base64,
    /// bad JSON, missing subject) yields `None`. Never panics.
    pub fn decode(token: &str) -> Option<Self> {
        let payload = token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Expiry as a timestamp, if the token carries one
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|s| Utc.timestamp_opt(s, 0).single())
    }
}
