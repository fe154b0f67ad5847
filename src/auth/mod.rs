pub mod guard;
pub mod password;
pub mod principal;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::Session;

pub use guard::AuthGuard;
pub use principal::Principal;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: String, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            email,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

/// Signs and validates bearer session tokens (HS256 JWTs)
#[derive(Clone)]
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(secret: &str, expiry_hours: u64) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::InvalidSecret);
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(expiry_hours as i64),
        })
    }

    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<Session, SessionError> {
        let claims = Claims::new(user_id, email.to_string(), self.ttl);
        let expires_at = expiry_of(&claims);

        let access_token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| SessionError::TokenGeneration(e.to_string()))?;

        Ok(Session {
            access_token,
            token_type: "bearer",
            expires_at,
            user_id,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, SessionError> {
        let token_data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|e| SessionError::InvalidToken(e.to_string()))?;

        Ok(token_data.claims)
    }
}

fn expiry_of(claims: &Claims) -> DateTime<Utc> {
    Utc.timestamp_opt(claims.exp, 0)
        .single()
        .unwrap_or_else(Utc::now)
}
