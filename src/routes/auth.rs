/// Authentication Routes
///
/// Registration, login, access token refresh and logout. Validation and
/// token handling live in `AuthService`; these handlers only shape the
/// request and response bodies.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, IssuedTokens};
use crate::error::{AppError, ErrorContext};
use crate::middleware::AuthenticatedUser;
use crate::routes::{MessageResponse, UserResponse};

/// User registration request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Token refresh request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Register/login response with both tokens
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AuthResponse {
    fn new(issued: IssuedTokens, expires_in: i64) -> Self {
        Self {
            user: UserResponse::from(&issued.user),
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// Refresh response: only a new access token
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// POST /users/auth/register
///
/// # Errors
/// - 400: first failing field rule, or username already used
/// - 500: Internal server error
pub async fn register(
    form: web::Json<RegisterRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let issued = auth
        .register(
            form.full_name.as_deref(),
            form.username.as_deref(),
            form.password.as_deref(),
        )
        .await
        .map_err(|e| {
            context.log_error(&e);
            e
        })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %issued.user.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(AuthResponse::new(issued, auth.access_token_expiry())))
}

/// POST /users/auth/login
///
/// # Errors
/// - 400: missing or too short username/password
/// - 401: unknown username or wrong password (same response for both)
/// - 500: Internal server error
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let issued = auth
        .login(form.username.as_deref(), form.password.as_deref())
        .await
        .map_err(|e| {
            context.log_error(&e);
            e
        })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %issued.user.id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(AuthResponse::new(issued, auth.access_token_expiry())))
}

/// POST /users/auth/refresh
///
/// Exchanges the stored refresh token for a new access token. The
/// refresh token is not rotated and stays valid.
///
/// A missing or unreadable body is treated like a missing token.
///
/// # Errors
/// - 400: Refresh token is required
/// - 401: Invalid or expired refresh token / Invalid refresh token
pub async fn refresh(
    form: Option<web::Json<RefreshRequest>>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = form.and_then(|form| form.into_inner().refresh_token);

    let access_token = auth.refresh(refresh_token.as_deref()).await?;

    Ok(HttpResponse::Ok().json(RefreshResponse { access_token }))
}

/// POST /users/auth/logout
///
/// **Requires valid access token.** Clears the stored refresh token.
///
/// # Errors
/// - 401: rejected by the guard
/// - 404: User not found
/// - 500: Internal server error
pub async fn logout(
    user: AuthenticatedUser,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_logout").with_user_id(user.id.to_string());

    auth.logout(user.id).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User logged out"
    );

    Ok(HttpResponse::Ok().json(MessageResponse::new("User logged out successfully")))
}
