//! Signed bearer tokens (HS256 JWT).
//!
//! The signing key is process configuration handed to [`TokenKeys::new`];
//! nothing here is global.

use crate::domain::model::{EntityId, User};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: EntityId,
    pub email: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token could not be signed: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
    #[error("token rejected: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        let now = jsonwebtoken::get_current_timestamp();
        let claims = Claims {
            id: user.id,
            email: user.email.clone(),
            iat: now,
            exp: now + self.ttl.as_secs(),
        };
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(TokenError::Sign)
    }

    /// Checks signature, algorithm and expiry, then returns the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            ..User::new("ada@example.com", "ada", 36, "hash")
        }
    }

    #[test]
    fn issued_token_verifies_with_same_key() {
        let keys = TokenKeys::new(b"secret", Duration::from_secs(60));
        let token = keys.issue(&user()).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.id, 7);
        assert_eq!(claims.email, "ada@example.com");
    }

    #[test]
    fn foreign_key_expired_and_garbage_tokens_are_rejected() {
        let keys = TokenKeys::new(b"secret", Duration::from_secs(60));
        let other = TokenKeys::new(b"other", Duration::from_secs(60));
        assert!(keys.verify(&other.issue(&user()).unwrap()).is_err());

        let now = jsonwebtoken::get_current_timestamp();
        let expired = keys
            .sign(&Claims {
                id: 7,
                email: "ada@example.com".into(),
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();
        assert!(keys.verify(&expired).is_err());

        assert!(keys.verify("not.a.token").is_err());
    }
}
