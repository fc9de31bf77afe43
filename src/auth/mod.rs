pub mod password;
pub mod validation;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, kind: TokenKind, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn access(user_id: Uuid) -> Self {
        let hours = config::config().security.access_token_hours;
        Self::new(user_id, TokenKind::Access, Duration::hours(hours))
    }

    pub fn refresh(user_id: Uuid) -> Self {
        let days = config::config().security.refresh_token_days;
        Self::new(user_id, TokenKind::Refresh, Duration::days(days))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("JWT secret not configured")]
    MissingSecret,
    #[error("Token expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(String),
    #[error("Token has the wrong kind")]
    WrongKind,
}

/// Access and refresh token pair handed out at signup and signin
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

fn secret_for(kind: TokenKind) -> &'static str {
    let security = &config::config().security;
    match kind {
        TokenKind::Access => &security.jwt_secret,
        TokenKind::Refresh => &security.jwt_refresh_secret,
    }
}

pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Decode and verify a token, requiring it to be of `expected` kind
pub fn decode_token(token: &str, secret: &str, expected: TokenKind) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    let claims = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Invalid(e.to_string()),
        })?
        .claims;

    if claims.kind != expected {
        return Err(JwtError::WrongKind);
    }

    Ok(claims)
}

pub fn generate_access_token(user_id: Uuid) -> Result<String, JwtError> {
    encode_token(&Claims::access(user_id), secret_for(TokenKind::Access))
}

pub fn generate_refresh_token(user_id: Uuid) -> Result<String, JwtError> {
    encode_token(&Claims::refresh(user_id), secret_for(TokenKind::Refresh))
}

pub fn generate_token_pair(user_id: Uuid) -> Result<TokenPair, JwtError> {
    Ok(TokenPair {
        access_token: generate_access_token(user_id)?,
        refresh_token: generate_refresh_token(user_id)?,
    })
}

pub fn validate_access_token(token: &str) -> Result<Claims, JwtError> {
    decode_token(token, secret_for(TokenKind::Access), TokenKind::Access)
}

pub fn validate_refresh_token(token: &str) -> Result<Claims, JwtError> {
    decode_token(token, secret_for(TokenKind::Refresh), TokenKind::Refresh)
}
