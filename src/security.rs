//! Password hashing and bearer-token issuance.
//!
//! Passwords are stored as PBKDF2-SHA256 digests with a per-user random
//! salt. Tokens are JWTs carrying the user id and role; verification
//! distinguishes an expired token from a malformed one so the API can
//! report each with its own message.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::models::enums::Role;

pub const PBKDF2_ITERATIONS: u32 = 600_000;
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 16;

const HASH_SCHEME: &str = "pbkdf2-sha256";

/// Errors from password or token handling.
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token")]
    TokenInvalid,
    #[error("Stored password hash is malformed")]
    MalformedHash,
    #[error("Failed to sign token: {0}")]
    TokenSigning(String),
}

// ── Passwords ───────────────────────────────────────────────

/// Hash a password with a fresh random salt.
///
/// Output format: `pbkdf2-sha256$<iterations>$<salt b64>$<digest b64>`.
pub fn hash_password(password: &str) -> String {
    let salt = generate_salt();
    let digest = derive(password, &salt, PBKDF2_ITERATIONS);
    format!(
        "{HASH_SCHEME}${PBKDF2_ITERATIONS}${}${}",
        BASE64.encode(salt),
        BASE64.encode(digest),
    )
}

/// Check a password against a stored hash string.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, SecurityError> {
    let mut parts = stored.split('$');
    let scheme = parts.next().ok_or(SecurityError::MalformedHash)?;
    if scheme != HASH_SCHEME {
        return Err(SecurityError::MalformedHash);
    }
    let iterations: u32 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or(SecurityError::MalformedHash)?;
    let salt = parts
        .next()
        .and_then(|s| BASE64.decode(s).ok())
        .ok_or(SecurityError::MalformedHash)?;
    let expected = parts
        .next()
        .and_then(|s| BASE64.decode(s).ok())
        .ok_or(SecurityError::MalformedHash)?;

    let digest = derive(password, &salt, iterations);
    Ok(digest.as_slice() == expected.as_slice())
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut digest = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut digest);
    digest
}

fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

// ── Tokens ──────────────────────────────────────────────────

/// JWT payload: subject is the user id, role rides along so gates can
/// log it without a DB round trip.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_token(
    user_id: &Uuid,
    role: Role,
    secret: &str,
    ttl_secs: u64,
) -> Result<String, SecurityError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        iat: now,
        exp: now + ttl_secs as i64,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| SecurityError::TokenSigning(e.to_string()))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, SecurityError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => SecurityError::TokenExpired,
        _ => SecurityError::TokenInvalid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let stored = hash_password("hunter22");
        assert!(verify_password("hunter22", &stored).unwrap());
        assert!(!verify_password("hunter23", &stored).unwrap());
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = hash_password("hunter22");
        let b = hash_password("hunter22");
        assert_ne!(a, b, "Salts must differ between calls");
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(matches!(
            verify_password("x", "not-a-hash"),
            Err(SecurityError::MalformedHash)
        ));
        assert!(matches!(
            verify_password("x", "md5$1$YQ==$YQ=="),
            Err(SecurityError::MalformedHash)
        ));
    }

    #[test]
    fn token_round_trip_carries_subject_and_role() {
        let user_id = Uuid::new_v4();
        let token = issue_token(&user_id, Role::Doctor, "secret", 3600).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, "doctor");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_invalid_not_expired() {
        let token = issue_token(&Uuid::new_v4(), Role::Patient, "secret", 3600).unwrap();
        assert!(matches!(
            verify_token(&token, "other"),
            Err(SecurityError::TokenInvalid)
        ));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        // exp in the past; jsonwebtoken's default leeway is 60s, so go
        // well beyond it.
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            role: "patient".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(matches!(
            verify_token(&token, "secret"),
            Err(SecurityError::TokenExpired)
        ));
    }

    #[test]
    fn pbkdf2_takes_meaningful_time() {
        let start = std::time::Instant::now();
        let _ = hash_password("test_password");
        assert!(
            start.elapsed().as_millis() > 50,
            "PBKDF2 too fast, brute force protection insufficient"
        );
    }
}
