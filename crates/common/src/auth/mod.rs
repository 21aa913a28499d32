//! Authentication utilities
//!
//! Provides:
//! - JWT token generation and validation (the bearer-token collaborator)
//! - Argon2 password hashing and verification
//! - The authenticated-professional extractor for handlers

use crate::errors::{AppError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Extracted authentication context available to handlers.
///
/// Carries the requesting professional's identity; every ownership check in
/// the data layer compares against `professional_id`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Authenticated professional ID
    pub professional_id: Uuid,

    /// Professional email (from token claims)
    pub email: String,

    /// Professional display name (from token claims)
    pub full_name: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (professional ID)
    pub sub: String,

    /// Professional email
    pub email: String,

    /// Professional full name
    pub name: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// JWT token manager
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Generate a new JWT token for a professional
    pub fn generate_token(
        &self,
        professional_id: Uuid,
        email: &str,
        full_name: &str,
    ) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: professional_id.to_string(),
            email: email.to_string(),
            name: full_name.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }

    /// Build an AuthContext from a validated bearer token
    pub fn authenticate(&self, token: &str) -> Result<AuthContext> {
        let claims = self.validate_token(token)?;
        let professional_id =
            Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

        Ok(AuthContext {
            professional_id,
            email: claims.email,
            full_name: claims.name,
        })
    }
}

/// Hash a password for storage
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal {
            message: format!("Failed to hash password: {}", e),
        })
}

/// Verify a password against a stored hash.
///
/// A malformed stored hash verifies as false rather than erroring; login
/// reports generic invalid-credentials either way.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Extract a bearer token from an Authorization header value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// Axum extractor for AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
    JwtManager: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing Authorization header".to_string(),
            })?;

        let token = extract_bearer(auth_header).ok_or_else(|| AppError::Unauthorized {
            message: "Expected a bearer token".to_string(),
        })?;

        let jwt = JwtManager::from_ref(state);
        jwt.authenticate(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn test_verify_malformed_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_bearer("abc.def.ghi"), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);

        let id = Uuid::new_v4();
        let token = manager
            .generate_token(id, "ana@example.cl", "Ana Pérez")
            .unwrap();
        let ctx = manager.authenticate(&token).unwrap();

        assert_eq!(ctx.professional_id, id);
        assert_eq!(ctx.email, "ana@example.cl");
        assert_eq!(ctx.full_name, "Ana Pérez");
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new("test_secret", 0);
        let token = manager
            .generate_token(Uuid::new_v4(), "a@b.cl", "A")
            .unwrap();
        // exp == iat, and the default validation applies a 60s leeway; build
        // a manager with negative expiry to force rejection instead.
        let expired = JwtManager {
            encoding_key: EncodingKey::from_secret(b"test_secret"),
            decoding_key: DecodingKey::from_secret(b"test_secret"),
            expiration_secs: -120,
        };
        let token_expired = expired
            .generate_token(Uuid::new_v4(), "a@b.cl", "A")
            .unwrap();
        assert!(matches!(
            expired.authenticate(&token_expired),
            Err(AppError::ExpiredToken)
        ));
        // A fresh-but-zero-ttl token still parses within leeway
        assert!(manager.authenticate(&token).is_ok());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let manager = JwtManager::new("test_secret", 3600);
        let other = JwtManager::new("other_secret", 3600);
        let token = manager
            .generate_token(Uuid::new_v4(), "a@b.cl", "A")
            .unwrap();
        assert!(matches!(
            other.authenticate(&token),
            Err(AppError::InvalidToken)
        ));
    }
}
