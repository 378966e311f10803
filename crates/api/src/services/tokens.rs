//! Signed bearer tokens (HS256 JWTs).
//!
//! Login and signup hand out an access/refresh pair. The access token
//! authenticates requests; the refresh token can only be exchanged for a new
//! access token.

use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// How long an access token is accepted.
pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(3653 * 24 * 60 * 60);
/// How long a refresh token is accepted.
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn ttl(self) -> Duration {
        match self {
            TokenKind::Access => ACCESS_TOKEN_TTL,
            TokenKind::Refresh => REFRESH_TOKEN_TTL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub token_type: TokenKind,
    pub user_id: i64,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Issues and checks bearer tokens.
#[cfg_attr(test, mockall::automock)]
pub trait TokenService: Send + Sync {
    /// Sign a token of `kind` for the user.
    fn issue(&self, user_id: i64, kind: TokenKind) -> Result<String>;

    /// Verify signature, expiry and kind. Returns the user id.
    fn verify(&self, token: &str, kind: TokenKind) -> Result<i64>;

    /// Sign a fresh access/refresh pair.
    fn issue_pair(&self, user_id: i64) -> Result<TokenPair> {
        Ok(TokenPair {
            access: self.issue(user_id, TokenKind::Access)?,
            refresh: self.issue(user_id, TokenKind::Refresh)?,
        })
    }
}

/// HMAC-SHA256 implementation of TokenService.
pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtTokenService {
    pub fn new(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            anyhow::bail!("JWT secret must not be empty");
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, user_id: i64, kind: TokenKind) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            token_type: kind,
            user_id,
            iat: now,
            exp: now + kind.ttl().as_secs() as i64,
            jti: uuid::Uuid::new_v4().simple().to_string(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    fn verify(&self, token: &str, kind: TokenKind) -> Result<i64> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;

        if data.claims.token_type != kind {
            return Err(anyhow!(
                "expected {:?} token, got {:?}",
                kind,
                data.claims.token_type
            ));
        }

        Ok(data.claims.user_id)
    }
}
