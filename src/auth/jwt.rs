//! JWT token encoding and decoding using HS256.
//!
//! The token is only consumed for the identity it carries (email); user
//! records, roles, and scopes are resolved from the store per request.

use anyhow::{Context, Result};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — user UUID
    pub sub: String,
    /// User email — the identity the access layer resolves
    pub email: String,
    /// User display name
    pub name: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Encode a JWT token for the given user.
pub fn encode_jwt(
    user_id: Uuid,
    email: &str,
    name: &str,
    secret: &str,
    expiry_secs: u64,
) -> Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        iat: now,
        exp: now + expiry_secs as i64,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to encode JWT")
}

/// Decode and validate a JWT token.
///
/// Returns the claims if the token is valid, not expired, and signed with
/// the correct secret.
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims> {
    let token_data: TokenData<Claims> = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .context("Failed to decode JWT")?;

    Ok(token_data.claims)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test-secret-key-minimum-32-chars!!";

    #[test]
    fn test_encode_decode_roundtrip() {
        let user_id = Uuid::new_v4();
        let token = encode_jwt(user_id, "alice@example.com", "Alice", TEST_SECRET, 3600)
            .expect("encode should succeed");

        let claims = decode_jwt(&token, TEST_SECRET).expect("decode should succeed");
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.name, "Alice");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "bob@example.com".to_string(),
            name: "Bob".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };

        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .expect("encode should succeed");

        assert!(decode_jwt(&token, TEST_SECRET).is_err());
    }

    #[test]
    fn test_invalid_secret_rejected() {
        let token = encode_jwt(
            Uuid::new_v4(),
            "charlie@example.com",
            "Charlie",
            TEST_SECRET,
            3600,
        )
        .expect("encode should succeed");

        assert!(decode_jwt(&token, "wrong-secret-that-is-also-32chars!").is_err());
    }

    #[test]
    fn test_malformed_token_rejected() {
        assert!(decode_jwt("not.a.valid.jwt", TEST_SECRET).is_err());
        assert!(decode_jwt("", TEST_SECRET).is_err());
        assert!(decode_jwt("just-random-text", TEST_SECRET).is_err());
    }
}
