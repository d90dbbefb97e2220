use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config;
use crate::database::models::UserType;

/// Session token claims. `sid` keys the session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub sid: String,
    pub user_type: UserType,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, session_id: String, user_type: UserType) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            sid: session_id,
            user_type,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
    #[error("Invalid JWT secret")]
    InvalidSecret,
}

fn secret() -> Result<&'static str, JwtError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }
    Ok(secret)
}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    let encoding_key = EncodingKey::from_secret(secret()?.as_bytes());

    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str) -> Result<Claims, JwtError> {
    let decoding_key = DecodingKey::from_secret(secret()?.as_bytes());

    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

/// Hex SHA-256 digest stored in `users.password_hash`.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    hash_password(password).eq_ignore_ascii_case(password_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_session_claims() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, "session-1".to_string(), UserType::Reseller);
        let token = generate_jwt(&claims).unwrap();

        let decoded = validate_jwt(&token).unwrap();
        assert_eq!(decoded.sub, user_id);
        assert_eq!(decoded.sid, "session-1");
        assert_eq!(decoded.user_type, UserType::Reseller);
    }

    #[test]
    fn rejects_garbage_tokens() {
        assert!(matches!(validate_jwt("not-a-token"), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn verifies_password_digest() {
        let hash = hash_password("hunter2");
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }
}
