/// Input validators for registration, login and password change
///
/// Each validator takes the raw optional field, rejects it if missing or
/// too short, and returns the accepted value. The error's `Display` is the
/// message returned to the client, so the first failing rule is reported.

use crate::error::ValidationError;

pub const MIN_FULL_NAME_LENGTH: usize = 3;
pub const MIN_USERNAME_LENGTH: usize = 8;
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Validates the display name. Stored as given.
pub fn validate_full_name(full_name: Option<&str>) -> Result<String, ValidationError> {
    let full_name = full_name.ok_or(ValidationError::Required("Full name"))?;

    if full_name.chars().count() < MIN_FULL_NAME_LENGTH {
        return Err(ValidationError::TooShort("Full name", MIN_FULL_NAME_LENGTH));
    }

    Ok(full_name.to_string())
}

/// Validates a username's shape. Uniqueness is checked against the store by the caller.
pub fn validate_username(username: Option<&str>) -> Result<String, ValidationError> {
    let username = username.ok_or(ValidationError::Required("Username"))?;

    if username.chars().count() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort("Username", MIN_USERNAME_LENGTH));
    }

    Ok(username.to_string())
}

/// Validates a password. Never trimmed: whitespace is significant.
pub fn validate_password(password: Option<&str>) -> Result<String, ValidationError> {
    validate_secret("Password", password)
}

pub fn validate_new_password(password: Option<&str>) -> Result<String, ValidationError> {
    validate_secret("New password", password)
}

fn validate_secret(field: &'static str, value: Option<&str>) -> Result<String, ValidationError> {
    let value = value.ok_or(ValidationError::Required(field))?;

    if value.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort(field, MIN_PASSWORD_LENGTH));
    }

    Ok(value.to_string())
}
