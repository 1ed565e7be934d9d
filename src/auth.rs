use crate::config::Config;
use crate::errors::AppError;
use crate::models::User;
use axum::http::{header, HeaderMap};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Header carrying the tenant context for unauthenticated endpoints.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Identity extracted from a verified bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthClaims {
    pub user_id: i64,
    pub tenant_id: i64,
    pub expires_at: i64,
}

/// Hashes a password with a fresh random salt.
///
/// Stored as `"{salt_hex}${digest_hex}"`. Password hashing is declared
/// external plumbing by the product scope; this keeps it on the crate's
/// existing sha2 stack.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt_hex = hex::encode(salt);
    let digest = password_digest(&salt_hex, password);
    format!("{}${}", salt_hex, digest)
}

fn password_digest(salt_hex: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verifies a password against a stored `salt$digest` value.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt_hex, digest)) => password_digest(salt_hex, password) == digest,
        None => false,
    }
}

/// Issues a signed bearer token: `user_id.tenant_id.expires_at.signature`.
pub fn issue_token(config: &Config, user: &User) -> String {
    let expires_at = chrono::Utc::now().timestamp() + config.token_ttl_hours * 3600;
    let signature = token_signature(&config.token_secret, user.id, user.tenant_id, expires_at);
    format!("{}.{}.{}.{}", user.id, user.tenant_id, expires_at, signature)
}

fn token_signature(secret: &str, user_id: i64, tenant_id: i64, expires_at: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(format!(".{}.{}.{}", user_id, tenant_id, expires_at).as_bytes());
    hex::encode(hasher.finalize())
}

/// Verifies a bearer token's signature and expiry.
pub fn verify_token(config: &Config, token: &str) -> Result<AuthClaims, AppError> {
    let invalid = || AppError::Unauthorized("Invalid authentication token".to_string());

    let mut parts = token.split('.');
    let user_id: i64 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(invalid)?;
    let tenant_id: i64 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(invalid)?;
    let expires_at: i64 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(invalid)?;
    let signature = parts.next().ok_or_else(invalid)?;
    if parts.next().is_some() {
        return Err(invalid());
    }

    let expected = token_signature(&config.token_secret, user_id, tenant_id, expires_at);
    if signature != expected {
        return Err(invalid());
    }

    if expires_at <= chrono::Utc::now().timestamp() {
        return Err(AppError::Unauthorized(
            "Authentication token expired".to_string(),
        ));
    }

    Ok(AuthClaims {
        user_id,
        tenant_id,
        expires_at,
    })
}

/// Extracts and verifies the `Authorization: Bearer` token of a request.
pub fn authenticate(config: &Config, headers: &HeaderMap) -> Result<AuthClaims, AppError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Authentication token required".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Bearer token required".to_string()))?;

    verify_token(config, token)
}

/// Reads the tenant id from the `X-Tenant-ID` header.
pub fn tenant_id_from_headers(headers: &HeaderMap) -> Result<i64, AppError> {
    headers
        .get(TENANT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .ok_or_else(|| {
            AppError::Validation("X-Tenant-ID header required".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_config(ttl_hours: i64) -> Config {
        Config {
            database_url: "postgres://localhost/test".to_string(),
            port: 0,
            token_secret: "test-secret-at-least-16-chars".to_string(),
            token_ttl_hours: ttl_hours,
        }
    }

    fn test_user() -> User {
        let now = Utc::now();
        User {
            id: 42,
            tenant_id: 3,
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            phone: "3000000000".to_string(),
            document_type: "cedula".to_string(),
            document_number: "12345678".to_string(),
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter2-hunter2");
        assert!(verify_password("hunter2-hunter2", &hash));
        assert!(!verify_password("wrong-password", &hash));
        // Each hash gets its own salt.
        assert_ne!(hash, hash_password("hunter2-hunter2"));
    }

    #[test]
    fn token_round_trip() {
        let config = test_config(24);
        let token = issue_token(&config, &test_user());
        let claims = verify_token(&config, &token).expect("token must verify");
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.tenant_id, 3);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let config = test_config(24);
        let token = issue_token(&config, &test_user());
        let tampered = token.replacen("42", "41", 1);
        assert!(verify_token(&config, &tampered).is_err());
        assert!(verify_token(&config, "garbage").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = test_config(-1);
        let token = issue_token(&config, &test_user());
        assert!(verify_token(&config, &token).is_err());
    }
}
