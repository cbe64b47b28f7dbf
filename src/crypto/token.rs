//! Signed, time-limited identity tokens.
//!
//! Format: `<payload>.<signature>` where payload is base64url JSON
//! `{sub, iat, exp}` and signature is base64url HMAC-SHA256 over the
//! encoded payload. Verification yields the subject id only; callers
//! resolve roles from storage.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;
use zeroize::Zeroizing;

use super::CryptoError;

type HmacSha256 = Hmac<Sha256>;

pub const SECRET_LENGTH: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: Uuid,
    iat: i64,
    exp: i64,
}

/// Issues and verifies identity tokens with a process-held secret.
#[derive(Clone)]
pub struct TokenService {
    secret: Zeroizing<Vec<u8>>,
    ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, CryptoError> {
        if secret.is_empty() {
            return Err(CryptoError::EmptySecret);
        }
        Ok(Self {
            secret: Zeroizing::new(secret.to_vec()),
            ttl,
        })
    }

    /// Random per-process secret. Tokens die with the process.
    pub fn ephemeral(ttl: Duration) -> Self {
        let bytes: Zeroizing<[u8; SECRET_LENGTH]> = Zeroizing::new(rand::random());
        Self {
            secret: Zeroizing::new(bytes.to_vec()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, subject: &Uuid) -> Result<String, CryptoError> {
        self.issue_at(subject, Utc::now())
    }

    pub fn issue_at(&self, subject: &Uuid, now: DateTime<Utc>) -> Result<String, CryptoError> {
        let claims = TokenClaims {
            sub: *subject,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let json =
            serde_json::to_vec(&claims).map_err(|e| CryptoError::Encoding(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, CryptoError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, CryptoError> {
        let (payload, signature) = token.split_once('.').ok_or(CryptoError::MalformedToken)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| CryptoError::MalformedToken)?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| CryptoError::InvalidSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| CryptoError::MalformedToken)?;
        let claims: TokenClaims =
            serde_json::from_slice(&json).map_err(|_| CryptoError::MalformedToken)?;

        if now.timestamp() >= claims.exp {
            return Err(CryptoError::TokenExpired);
        }
        Ok(claims.sub)
    }

    fn mac(&self) -> Result<HmacSha256, CryptoError> {
        <HmacSha256 as Mac>::new_from_slice(&self.secret).map_err(|_| CryptoError::EmptySecret)
    }
}
