use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const CSRF_TTL_MINUTES: i64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Session,
    Csrf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub username: String,
    pub purpose: TokenPurpose,
    pub iat: i64,
    pub exp: i64,
    /// Random nonce so two tokens minted in the same second still differ.
    pub jti: Uuid,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
    #[error("invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),
    #[error("token issued for {found:?}, expected {expected:?}")]
    WrongPurpose {
        expected: TokenPurpose,
        found: TokenPurpose,
    },
}

/// Signs and verifies HS256 tokens for admin sessions and anti-forgery checks.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, session_ttl_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            session_ttl: Duration::hours(session_ttl_hours),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub fn issue_session(&self, admin_id: Uuid, username: &str) -> Result<String, TokenError> {
        self.issue(admin_id, username, TokenPurpose::Session, self.session_ttl)
    }

    pub fn issue_csrf(&self, admin_id: Uuid) -> Result<String, TokenError> {
        self.issue(
            admin_id,
            "",
            TokenPurpose::Csrf,
            Duration::minutes(CSRF_TTL_MINUTES),
        )
    }

    /// Mints a token that expires `ttl` from now; a negative `ttl` yields an expired token.
    pub fn issue(
        &self,
        subject: Uuid,
        username: &str,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject,
            username: username.to_string(),
            purpose,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    pub fn verify(&self, token: &str, purpose: TokenPurpose) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(TokenError::Invalid)?
            .claims;

        if claims.purpose != purpose {
            return Err(TokenError::WrongPurpose {
                expected: purpose,
                found: claims.purpose,
            });
        }

        Ok(claims)
    }
}
