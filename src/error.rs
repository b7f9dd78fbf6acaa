/// Error Handling Module
///
/// Unified error handling for the user service:
/// 1. Domain-specific error types (token, auth, validation, database)
/// 2. A single `AppError` used for control flow in handlers
/// 3. HTTP response mapping with a uniform JSON envelope
/// 4. Structured error logging with request context
///
/// Internal causes stay distinguishable in logs. Client messages are
/// coarser: several causes share one message.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Failures produced by the token codec
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Not a well-formed JWT, or its claims cannot be read
    Malformed,
    /// Signature does not verify against the configured secret
    InvalidSignature,
    /// `exp` is in the past
    Expired,
    /// Signing failed
    Encoding(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "token is malformed"),
            TokenError::InvalidSignature => write!(f, "token signature is invalid"),
            TokenError::Expired => write!(f, "token has expired"),
            TokenError::Encoding(msg) => write!(f, "token encoding failed: {}", msg),
        }
    }
}

impl StdError for TokenError {}

/// Authentication and authorization errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No Authorization header, or no credential after the scheme
    MissingCredential,
    /// Access token failed to decode
    InvalidToken(TokenError),
    /// Access token subject does not resolve to a user
    UserNotFound,
    /// Refresh request without a token
    MissingRefreshToken,
    /// Refresh token failed to decode
    InvalidRefreshToken(TokenError),
    /// Refresh token owner is gone, or the token is not the stored one
    RefreshMismatch,
    /// Store failed while loading the refresh token owner
    RefreshLookupFailed,
    /// Unknown username or wrong password at login
    InvalidCredentials,
    /// Current password check failed on password change
    WrongPassword,
}

impl AuthError {
    /// Message sent to clients. Several internal causes share one message.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::MissingCredential | AuthError::InvalidToken(_) => {
                "Invalid or expired access token"
            }
            AuthError::UserNotFound => "User not found",
            AuthError::MissingRefreshToken => "Refresh token is required",
            AuthError::InvalidRefreshToken(_) | AuthError::RefreshLookupFailed => {
                "Invalid or expired refresh token"
            }
            AuthError::RefreshMismatch => "Invalid refresh token",
            AuthError::InvalidCredentials => "Invalid username or password",
            AuthError::WrongPassword => "Wrong password",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingRefreshToken => StatusCode::BAD_REQUEST,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "MISSING_TOKEN",
            AuthError::InvalidToken(_) => "TOKEN_INVALID",
            AuthError::UserNotFound => "UNAUTHORIZED",
            AuthError::MissingRefreshToken => "MISSING_REFRESH_TOKEN",
            AuthError::InvalidRefreshToken(_)
            | AuthError::RefreshMismatch
            | AuthError::RefreshLookupFailed => "REFRESH_TOKEN_INVALID",
            AuthError::InvalidCredentials | AuthError::WrongPassword => "INVALID_CREDENTIALS",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingCredential => write!(f, "Missing authentication token"),
            AuthError::InvalidToken(e) => write!(f, "Invalid access token: {}", e),
            AuthError::UserNotFound => write!(f, "Token subject does not match a user"),
            AuthError::MissingRefreshToken => write!(f, "Missing refresh token"),
            AuthError::InvalidRefreshToken(e) => write!(f, "Invalid refresh token: {}", e),
            AuthError::RefreshMismatch => {
                write!(f, "Refresh token does not match the stored token")
            }
            AuthError::RefreshLookupFailed => write!(f, "Refresh token owner lookup failed"),
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::WrongPassword => write!(f, "Current password does not match"),
        }
    }
}

impl StdError for AuthError {}

/// Validation errors for request fields. `Display` is the client-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Required(&'static str),
    TooShort(&'static str, usize),
    AlreadyUsed(&'static str),
    InvalidBody(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Required(field) => write!(f, "{} is required", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} minimum {} characters", field, min)
            }
            ValidationError::AlreadyUsed(field) => write!(f, "{} already used", field),
            ValidationError::InvalidBody(msg) => write!(f, "Invalid request body: {}", msg),
        }
    }
}

impl StdError for ValidationError {}

/// Persistence errors raised by user stores
#[derive(Debug)]
pub enum DatabaseError {
    UniqueConstraintViolation(String),
    QueryExecution(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UniqueConstraintViolation(msg) => {
                write!(f, "Duplicate entry: {}", msg)
            }
            DatabaseError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        let message = err.to_string();
        match &err {
            // 23505 = unique_violation
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                DatabaseError::UniqueConstraintViolation(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::ConnectionPool(message)
            }
            sqlx::Error::Database(_) | sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DatabaseError::QueryExecution(message)
            }
            _ => DatabaseError::UnexpectedError(message),
        }
    }
}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type that handler errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Auth(AuthError),
    NotFound(String),
    Database(DatabaseError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.into())
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response envelope
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Converts errors to HTTP responses with matching log output
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = match self {
            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR".to_string(),
                e.to_string(),
            ),

            AppError::Auth(e) => (
                e.status_code(),
                e.code().to_string(),
                e.public_message().to_string(),
            ),

            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND".to_string(),
                msg.clone(),
            ),

            // Persistence detail never reaches the client
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR".to_string(),
                "Internal server error".to_string(),
            ),

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR".to_string(),
                "Internal server error".to_string(),
            ),
        };

        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message,
            code,
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(
                    request_id = request_id,
                    error = %e,
                    "Validation error"
                );
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                tracing::warn!(
                    request_id = request_id,
                    error = %self,
                    "Invalid credentials attempt"
                );
            }
            AppError::Auth(e) => {
                tracing::warn!(
                    request_id = request_id,
                    error = %e,
                    "Authentication error"
                );
            }
            AppError::NotFound(msg) => {
                tracing::info!(
                    request_id = request_id,
                    error = %msg,
                    "Resource not found"
                );
            }
            AppError::Database(e) => {
                tracing::error!(
                    request_id = request_id,
                    error = %e,
                    "Database error"
                );
            }
            AppError::Internal(msg) => {
                tracing::error!(
                    request_id = request_id,
                    error = %msg,
                    "Internal error"
                );
            }
        }
    }
}

/// Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(e) => e.status_code(),
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-operation context for log correlation
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_user_id(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn log_error(&self, error: &AppError) {
        let context = serde_json::json!({
            "request_id": self.request_id,
            "operation": self.operation,
            "user_id": self.user_id,
            "timestamp": self.timestamp.to_rfc3339(),
        });

        match error {
            AppError::Validation(_) | AppError::Auth(_) | AppError::NotFound(_) => {
                tracing::warn!(
                    error = %error,
                    context = ?context,
                    "Request rejected"
                );
            }
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(
                    error = %error,
                    context = ?context,
                    "Request failed"
                );
            }
        }
    }
}
