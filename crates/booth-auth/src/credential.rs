//! Credential model
//!
//! A credential is in one of three states:
//! - *valid*: access token present and not expired
//! - *refreshable*: expired but carrying a refresh token
//! - *invalid*: expired with no refresh token — only a full reauthorization
//!   can replace it
//!
//! `expires_at` is an absolute unix timestamp in milliseconds, computed at
//! storage time from the token response's `expires_in` delta. Tokens without
//! an `expires_in` never expire from our point of view; the server remains
//! the final authority via 401.

use serde::{Deserialize, Serialize};

use crate::token::TokenResponse;

/// A token is treated as expired this long before its actual expiry, so we
/// never present one that dies while the request is in flight.
const EXPIRY_SKEW_MILLIS: u64 = 30_000;

/// OAuth tokens for a single account session. In-memory only; nothing is
/// persisted beyond process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token for API calls
    pub access_token: String,
    /// Present only if the provider issued one
    pub refresh_token: Option<String>,
    /// Expiration as unix timestamp in milliseconds (absolute, not a delta)
    pub expires_at: Option<u64>,
    pub scopes: Vec<String>,
}

impl Credential {
    /// Build a credential from a token response received at `now_millis`.
    ///
    /// Scopes come from the response's `scope` field when present (space
    /// separated, per RFC 6749 §3.3), otherwise from the scopes we asked for.
    pub fn from_token_response(
        response: &TokenResponse,
        now_millis: u64,
        requested_scopes: &[String],
    ) -> Self {
        let scopes = match &response.scope {
            Some(granted) => granted.split_whitespace().map(str::to_owned).collect(),
            None => requested_scopes.to_vec(),
        };
        Self {
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone(),
            expires_at: response.expires_in.map(|delta| now_millis + delta * 1000),
            scopes,
        }
    }

    /// Whether the access token can still be presented at `now_millis`.
    pub fn is_valid_at(&self, now_millis: u64) -> bool {
        if self.access_token.is_empty() {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => now_millis + EXPIRY_SKEW_MILLIS < expires_at,
            None => true,
        }
    }

    /// Whether an expired credential can be renewed without reauthorizing.
    pub fn is_refreshable(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Valid or refreshable. Anything else needs a full reauthorization.
    pub fn is_usable_at(&self, now_millis: u64) -> bool {
        self.is_valid_at(now_millis) || self.is_refreshable()
    }
}

/// Current unix time in milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
