/// Password Hashing and Verification
///
/// Thin wrappers over bcrypt. Field length rules live in `validators`.

use bcrypt::{hash, verify};

use crate::error::AppError;

/// Hash a password using bcrypt at the given work factor
///
/// # Errors
/// Returns error if bcrypt hashing fails (e.g. cost out of range)
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
///
/// # Errors
/// Returns error if the stored hash cannot be parsed
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}
