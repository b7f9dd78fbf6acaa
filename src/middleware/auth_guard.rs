/// Bearer authentication extractor
///
/// Handlers that take an `AuthenticatedUser` argument only run once the
/// `Authorization` header has resolved to a stored user. A rejection
/// short-circuits the handler with the `AppError` response.

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use std::ops::Deref;

use crate::auth::AuthService;
use crate::error::AppError;
use crate::store::User;

#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl Deref for AuthenticatedUser {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // Header values that are not visible ASCII count as absent
        let authorization = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);
        let service = req.app_data::<web::Data<AuthService>>().cloned();

        Box::pin(async move {
            let service = service
                .ok_or_else(|| AppError::Internal("AuthService is not registered".to_string()))?;

            let user = service.authenticate(authorization.as_deref()).await?;
            Ok(AuthenticatedUser(user))
        })
    }
}
