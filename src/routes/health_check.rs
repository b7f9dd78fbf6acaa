use actix_web::HttpResponse;

use crate::error::AppError;

pub async fn health_check() -> HttpResponse {
    tracing::debug!("Health check endpoint called");
    HttpResponse::Ok().finish()
}

/// Fallback for unmatched routes, so they share the error envelope
pub async fn not_found() -> Result<HttpResponse, AppError> {
    Err(AppError::NotFound("Route not found".to_string()))
}
