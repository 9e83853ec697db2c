//! # Signed Tokens
//!
//! Signed, time-bounded tokens used for login sessions and for the OAuth
//! `state` parameter. A token is the hex-encoded JSON claims payload plus
//! a hex HMAC-SHA256 tag, joined with a dot. No session affinity: any
//! instance holding the signing secret can verify a token.

use course_core::{MarketError, MarketResult};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// What a token is allowed to be used for.
///
/// Purpose is part of the signed claims, so a stolen OAuth state token
/// can never be replayed as a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    /// Login session token
    Session,
    /// OAuth redirect state (short-lived, single flow)
    OauthState,
}

/// Signed token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user ID for sessions, random nonce for OAuth state
    pub sub: String,
    /// Purpose this token was issued for
    pub purpose: TokenPurpose,
    /// Issued-at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// Issues and verifies signed tokens with a shared secret
#[derive(Clone)]
pub struct TokenSigner {
    secret: String,
}

/// Session lifetime
pub const SESSION_TTL_HOURS: i64 = 24;

/// OAuth state lifetime; a login redirect older than this is stale
pub const STATE_TTL_MINUTES: i64 = 10;

impl TokenSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Issue a session token for a user
    pub fn issue_session(&self, user_id: Uuid) -> String {
        self.sign(Claims {
            sub: user_id.to_string(),
            purpose: TokenPurpose::Session,
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(SESSION_TTL_HOURS)).timestamp(),
        })
    }

    /// Issue an opaque OAuth state token
    pub fn issue_state(&self) -> String {
        self.sign(Claims {
            sub: Uuid::new_v4().to_string(),
            purpose: TokenPurpose::OauthState,
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::minutes(STATE_TTL_MINUTES)).timestamp(),
        })
    }

    fn sign(&self, claims: Claims) -> String {
        // Claims serialization cannot fail for this struct
        let payload = serde_json::to_vec(&claims).unwrap_or_default();
        let tag = self.tag(&payload);
        format!("{}.{}", hex::encode(payload), tag)
    }

    /// Verify a token's signature, expiry, and purpose
    pub fn verify(&self, token: &str, purpose: TokenPurpose) -> MarketResult<Claims> {
        let (payload_hex, tag) = token
            .split_once('.')
            .ok_or_else(|| MarketError::InvalidToken("wrong format".to_string()))?;

        let payload = hex::decode(payload_hex)
            .map_err(|_| MarketError::InvalidToken("undecodable payload".to_string()))?;

        let expected = self.tag(&payload);
        if !constant_time_compare(tag, &expected) {
            return Err(MarketError::InvalidToken("bad signature".to_string()));
        }

        let claims: Claims = serde_json::from_slice(&payload)
            .map_err(|_| MarketError::InvalidToken("undecodable claims".to_string()))?;

        if claims.purpose != purpose {
            return Err(MarketError::InvalidToken("wrong purpose".to_string()));
        }
        if claims.exp < Utc::now().timestamp() {
            return Err(MarketError::InvalidToken("expired".to_string()));
        }

        Ok(claims)
    }

    fn tag(&self, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
