/// JWT Claims structure
///
/// Payload shared by access and refresh tokens: the subject plus the
/// standard registered claims (RFC 7519).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token ID, unique per minted token
    pub jti: String,
}

impl Claims {
    /// Create claims for `subject` expiring `expiry_seconds` from now
    pub fn new(subject: impl Into<String>, expiry_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: subject.into(),
            iat: now,
            exp: now + expiry_seconds,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Subject as a user ID. `None` when the subject is not a UUID.
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}
