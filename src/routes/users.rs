/// User Routes
///
/// Profile, password change, and trash management. Every handler here
/// takes `AuthenticatedUser`, so none of them run without a valid
/// access token.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthService;
use crate::error::{AppError, ErrorContext};
use crate::middleware::AuthenticatedUser;
use crate::routes::{MessageResponse, UserResponse};
use crate::store::UserStore;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Deserialize)]
pub struct RestoreRequest {
    pub id: String,
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

/// Unparseable ids cannot name a user
fn parse_user_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| user_not_found())
}

/// PATCH /users/password
pub async fn change_password(
    user: AuthenticatedUser,
    form: web::Json<ChangePasswordRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    auth.change_password(
        &user,
        form.password.as_deref(),
        form.new_password.as_deref(),
    )
    .await?;

    tracing::info!(user_id = %user.id, "Password changed");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Password updated successfully")))
}

/// GET /users/info
pub async fn get_info(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(UserResponse::from(&*user))
}

/// GET /users/stored
pub async fn list_stored(
    _user: AuthenticatedUser,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let users: Vec<UserResponse> = store
        .list_active()
        .await?
        .iter()
        .map(UserResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(users))
}

/// GET /users/trash
pub async fn list_trash(
    _user: AuthenticatedUser,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let users: Vec<UserResponse> = store
        .list_deleted()
        .await?
        .iter()
        .map(UserResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(users))
}

/// DELETE /users/{id}
///
/// Moves the user to the trash and drops its refresh token.
pub async fn soft_delete(
    user: AuthenticatedUser,
    path: web::Path<String>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_soft_delete").with_user_id(user.id.to_string());
    let target = parse_user_id(&path)?;

    if !store.soft_delete(target).await? {
        let err = user_not_found();
        context.log_error(&err);
        return Err(err);
    }

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        target = %target,
        "User moved to trash"
    );
    Ok(HttpResponse::Ok().json(MessageResponse::new("User deleted successfully")))
}

/// DELETE /users/{id}/force
pub async fn force_delete(
    user: AuthenticatedUser,
    path: web::Path<String>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let target = parse_user_id(&path)?;

    if !store.delete(target).await? {
        return Err(user_not_found());
    }

    tracing::info!(user_id = %user.id, target = %target, "User permanently deleted");
    Ok(HttpResponse::Ok().json(MessageResponse::new("User permanently deleted")))
}

/// PUT /users/restore
pub async fn restore(
    user: AuthenticatedUser,
    form: web::Json<RestoreRequest>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let target = parse_user_id(&form.id)?;

    if !store.restore(target).await? {
        return Err(user_not_found());
    }

    tracing::info!(user_id = %user.id, target = %target, "User restored");
    Ok(HttpResponse::Ok().json(MessageResponse::new("User restored successfully")))
}
