/// JWT Token Encoding and Decoding
///
/// `TokenCodec` signs and verifies HS256 tokens with a secret supplied at
/// construction. Access and refresh tokens share the same claim shape.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::error::TokenError;

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact: a token is rejected as soon as `exp` passes
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign a token for `subject` that expires `ttl_seconds` from now
    ///
    /// # Errors
    /// Returns `TokenError::Encoding` if signing fails
    pub fn encode(&self, subject: &str, ttl_seconds: i64) -> Result<String, TokenError> {
        let claims = Claims::new(subject, ttl_seconds);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify signature and expiry, returning the claims
    ///
    /// # Errors
    /// - `Expired` when `exp` has passed
    /// - `InvalidSignature` when signed with another secret or tampered with
    /// - `Malformed` for anything that is not a readable HS256 JWT
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("JWT validation error: {}", e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                    _ => TokenError::Malformed,
                }
            })
    }
}
