//! Session validity service
//!
//! A session is derived, never stored: valid means a token is present
//! and its expiry (when it carries one) is still in the future. The
//! check is recomputed on every call so a cached boolean can never go
//! stale relative to the token itself.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::warn;

use crate::models::TokenClaims;
use crate::storage::Database;

/// Answers "is the session currently valid" over the durable token cell
#[derive(Clone)]
pub struct SessionService {
    db: Arc<Mutex<Database>>,
}

impl SessionService {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    /// The raw bearer token, if one is stored.
    ///
    /// Presence says nothing about validity; use [`is_valid`](Self::is_valid).
    pub fn token(&self) -> Option<String> {
        let db = self.db.lock().unwrap();
        match db.tokens().get() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read token cell");
                None
            }
        }
    }

    /// Decode the claims of an arbitrary token. Fails soft on malformed input.
    pub fn decode_claims(token: &str) -> Option<TokenClaims> {
        TokenClaims::decode(token)
    }

    /// Claims of the currently stored token, if present and decodable
    pub fn claims(&self) -> Option<TokenClaims> {
        self.token().and_then(|t| TokenClaims::decode(&t))
    }

    /// Whether the session is valid right now.
    ///
    /// False without a token. With a token, an `exp` claim in the past
    /// invalidates the session even though the store still returns the
    /// token; a token without `exp` (or without decodable claims) is
    /// treated as non-expiring client-side, the server stays
    /// authoritative.
    pub fn is_valid(&self) -> bool {
        let Some(token) = self.token() else {
            return false;
        };

        match TokenClaims::decode(&token).and_then(|c| c.exp) {
            Some(exp) => exp > Utc::now().timestamp(),
            None => true,
        }
    }

    /// User id from the current token's claims
    pub fn current_user_id(&self) -> Option<String> {
        self.claims().map(|c| c.sub)
    }

    /// Display name from the current token's claims
    pub fn current_user_name(&self) -> Option<String> {
        self.claims().and_then(|c| c.name)
    }
}
