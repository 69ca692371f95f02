/// Password hashing and session tokens
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::User;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

const SESSION_ALGORITHM: Algorithm = Algorithm::HS256;

/// Hash a password with Argon2id and a random salt.
///
/// Returns a PHC-formatted string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored PHC hash
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash format: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: i64,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 keys used to sign and check session tokens
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Sign a session token for `user`
    pub fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user.id,
            username: user.username.clone(),
            iat: now,
            exp: now + self.ttl_secs,
        };

        encode(&Header::new(SESSION_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign session: {}", e)))
    }

    /// Decode a session token; expired or tampered tokens are rejected
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        let mut validation = Validation::new(SESSION_ALGORITHM);
        validation.leeway = 0;

        decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid session: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 42,
            username: "leo".to_string(),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            email: None,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn password_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn session_token_carries_user() {
        let keys = SessionKeys::new("test-secret-test-secret-test-secret", 3600);
        let token = keys.issue(&user()).unwrap();

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.username, "leo");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = SessionKeys::new("first-secret-first-secret-first", 3600);
        let checker = SessionKeys::new("other-secret-other-secret-other", 3600);
        let token = issuer.issue(&user()).unwrap();

        assert!(matches!(
            checker.verify(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = SessionKeys::new("test-secret-test-secret-test-secret", -60);
        let token = keys.issue(&user()).unwrap();
        assert!(keys.verify(&token).is_err());
    }
}
