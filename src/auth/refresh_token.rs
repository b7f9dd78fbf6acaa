/// Refresh Token Storage Helpers
///
/// Refresh tokens are signed JWTs handed to the client as-is. The user
/// record keeps only the SHA-256 digest of the current one, so a
/// submitted token is accepted only if it is byte-identical to the last
/// token stored for that user.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of a refresh token
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Whether `token` is the refresh token whose digest is `stored`
pub fn matches_stored(token: &str, stored: Option<&str>) -> bool {
    match stored {
        Some(stored) => hash_token(token) == stored,
        None => false,
    }
}
