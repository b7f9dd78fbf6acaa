/// Authentication service
///
/// Owns the token codec and the user store handle and implements the
/// token lifecycle: bearer authentication, refresh-token exchange, logout,
/// and the register/login/password flows that issue or change credentials.
///
/// Refresh does not rotate the refresh token; it stays valid until it
/// expires, a later login overwrites it, or logout clears it. Concurrent
/// refreshes with the same stored token are not serialized.

use std::sync::Arc;

use uuid::Uuid;

use crate::audit::{AuditAction, AuditLog};
use crate::auth::jwt::TokenCodec;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::refresh_token::{hash_token, matches_stored};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, DatabaseError, TokenError, ValidationError};
use crate::store::{NewUser, User, UserStore};
use crate::validators::{
    validate_full_name, validate_new_password, validate_password, validate_username,
};

const USER_NOT_FOUND: &str = "User not found";

/// Tokens handed out by register and login
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    store: Arc<dyn UserStore>,
    codec: TokenCodec,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
    password_hash_cost: u32,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, jwt: &JwtSettings, password_hash_cost: u32) -> Self {
        Self {
            store,
            codec: TokenCodec::new(jwt.secret.as_bytes()),
            access_token_expiry: jwt.access_token_expiry,
            refresh_token_expiry: jwt.refresh_token_expiry,
            password_hash_cost,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Access token lifetime in seconds
    pub fn access_token_expiry(&self) -> i64 {
        self.access_token_expiry
    }

    /// Resolve the user behind an `Authorization` header value.
    ///
    /// The credential is the second whitespace-separated word of the header.
    /// A missing header or credential and an undecodable token produce the
    /// same client message; an unknown subject is reported separately.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<User, AppError> {
        let token = authorization
            .and_then(|header| header.split_whitespace().nth(1))
            .ok_or(AuthError::MissingCredential)?;

        let claims = self
            .codec
            .decode(token)
            .map_err(AuthError::InvalidToken)?;

        let user_id = claims.user_id().ok_or(AuthError::UserNotFound)?;
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        tracing::debug!(user_id = %user.id, "Access token validated");
        Ok(user)
    }

    /// Exchange a stored refresh token for a fresh access token.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<String, AppError> {
        let result = self.exchange_refresh_token(refresh_token).await;
        match &result {
            Ok((user_id, _)) => AuditLog::success(AuditAction::Refresh, *user_id).emit(),
            Err(e) => AuditLog::failure(AuditAction::Refresh, e.to_string()).emit(),
        }
        result.map(|(_, access_token)| access_token)
    }

    async fn exchange_refresh_token(
        &self,
        refresh_token: Option<&str>,
    ) -> Result<(Uuid, String), AppError> {
        let token = refresh_token
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingRefreshToken)?;

        let claims = self
            .codec
            .decode(token)
            .map_err(AuthError::InvalidRefreshToken)?;

        // A signed subject that is not a user id is an unreadable token
        let user_id = claims
            .user_id()
            .ok_or(AuthError::InvalidRefreshToken(TokenError::Malformed))?;

        let user = self.store.find_by_id(user_id).await.map_err(|e| {
            tracing::error!(user_id = %user_id, error = %e, "Refresh token owner lookup failed");
            AuthError::RefreshLookupFailed
        })?;

        // Unknown owner and stale token are indistinguishable to the caller
        let user = user
            .filter(|user| matches_stored(token, user.refresh_token.as_deref()))
            .ok_or(AuthError::RefreshMismatch)?;

        let access_token = self
            .codec
            .encode(&user.id.to_string(), self.access_token_expiry)?;

        Ok((user.id, access_token))
    }

    /// Clear the stored refresh token of an authenticated user.
    ///
    /// The user is re-read rather than trusting the copy the guard resolved.
    pub async fn logout(&self, user_id: Uuid) -> Result<(), AppError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

        if !self.store.set_refresh_token(user.id, None).await? {
            return Err(AppError::NotFound(USER_NOT_FOUND.to_string()));
        }

        AuditLog::success(AuditAction::Logout, user.id).emit();
        Ok(())
    }

    /// Validate registration fields, create the user and log them in.
    ///
    /// Fields are checked in order (full name, username, username
    /// uniqueness, password) and the first failure is returned.
    pub async fn register(
        &self,
        full_name: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<IssuedTokens, AppError> {
        let full_name = validate_full_name(full_name)?;
        let username = validate_username(username)?;
        if self.store.username_exists(&username).await? {
            return Err(ValidationError::AlreadyUsed("Username").into());
        }
        let password = validate_password(password)?;

        let password_hash = hash_password(&password, self.password_hash_cost)?;
        let user = self
            .store
            .insert(NewUser {
                full_name,
                username,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration
                DatabaseError::UniqueConstraintViolation(_) => {
                    AppError::Validation(ValidationError::AlreadyUsed("Username"))
                }
                other => AppError::Database(other),
            })?;

        AuditLog::success(AuditAction::Register, user.id).emit();
        self.issue_tokens(user).await
    }

    /// Check credentials and issue a new token pair.
    ///
    /// Issuing overwrites the stored refresh token, so any refresh token
    /// handed out earlier stops working.
    pub async fn login(
        &self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<IssuedTokens, AppError> {
        let username = validate_username(username)?;
        let password = validate_password(password)?;

        let user = match self.store.find_by_username(&username).await? {
            Some(user) if verify_password(&password, &user.password_hash)? => user,
            _ => {
                AuditLog::failure(AuditAction::Login, "Invalid credentials").emit();
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        AuditLog::success(AuditAction::Login, user.id).emit();
        self.issue_tokens(user).await
    }

    /// Replace the password of an authenticated user after checking the current one.
    pub async fn change_password(
        &self,
        user: &User,
        current_password: Option<&str>,
        new_password: Option<&str>,
    ) -> Result<(), AppError> {
        let current_password = current_password.ok_or(ValidationError::Required("Password"))?;
        let new_password = validate_new_password(new_password)?;

        if !verify_password(current_password, &user.password_hash)? {
            AuditLog::failure(AuditAction::ChangePassword, "Wrong password")
                .with_user_id(user.id)
                .emit();
            return Err(AuthError::WrongPassword.into());
        }

        let password_hash = hash_password(&new_password, self.password_hash_cost)?;
        if !self.store.set_password_hash(user.id, &password_hash).await? {
            return Err(AppError::NotFound(USER_NOT_FOUND.to_string()));
        }

        AuditLog::success(AuditAction::ChangePassword, user.id).emit();
        Ok(())
    }

    async fn issue_tokens(&self, user: User) -> Result<IssuedTokens, AppError> {
        let subject = user.id.to_string();
        let access_token = self.codec.encode(&subject, self.access_token_expiry)?;
        let refresh_token = self.codec.encode(&subject, self.refresh_token_expiry)?;

        let digest = hash_token(&refresh_token);
        if !self.store.set_refresh_token(user.id, Some(&digest)).await? {
            return Err(AppError::NotFound(USER_NOT_FOUND.to_string()));
        }

        Ok(IssuedTokens {
            user: User {
                refresh_token: Some(digest),
                ..user
            },
            access_token,
            refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorHandler;
    use crate::store::InMemoryUserStore;
    use actix_web::http::StatusCode;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    fn jwt_settings() -> JwtSettings {
        JwtSettings {
            secret: SECRET.to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
        }
    }

    fn service() -> (AuthService, Arc<InMemoryUserStore>) {
        let store = Arc::new(InMemoryUserStore::new());
        let service = AuthService::new(store.clone(), &jwt_settings(), 4);
        (service, store)
    }

    async fn registered(service: &AuthService) -> IssuedTokens {
        service
            .register(Some("John Doe"), Some("johndoe1"), Some("password123"))
            .await
            .expect("Failed to register user")
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    fn assert_auth_error(result: Result<impl std::fmt::Debug, AppError>, expected: AuthError) {
        match result {
            Err(AppError::Auth(actual)) => assert_eq!(actual, expected),
            other => panic!("Expected {:?}, got {:?}", expected, other),
        }
    }

    /// Store whose every call fails, as with an unreachable database
    struct FailingUserStore;

    fn unavailable<T>() -> Result<T, DatabaseError> {
        Err(DatabaseError::ConnectionPool("connection refused".to_string()))
    }

    #[async_trait::async_trait]
    impl UserStore for FailingUserStore {
        async fn find_by_id(&self, _id: Uuid) -> Result<Option<User>, DatabaseError> {
            unavailable()
        }

        async fn find_by_username(&self, _username: &str) -> Result<Option<User>, DatabaseError> {
            unavailable()
        }

        async fn username_exists(&self, _username: &str) -> Result<bool, DatabaseError> {
            unavailable()
        }

        async fn insert(&self, _user: NewUser) -> Result<User, DatabaseError> {
            unavailable()
        }

        async fn set_refresh_token(
            &self,
            _id: Uuid,
            _token_hash: Option<&str>,
        ) -> Result<bool, DatabaseError> {
            unavailable()
        }

        async fn set_password_hash(
            &self,
            _id: Uuid,
            _password_hash: &str,
        ) -> Result<bool, DatabaseError> {
            unavailable()
        }

        async fn list_active(&self) -> Result<Vec<User>, DatabaseError> {
            unavailable()
        }

        async fn list_deleted(&self) -> Result<Vec<User>, DatabaseError> {
            unavailable()
        }

        async fn soft_delete(&self, _id: Uuid) -> Result<bool, DatabaseError> {
            unavailable()
        }

        async fn restore(&self, _id: Uuid) -> Result<bool, DatabaseError> {
            unavailable()
        }

        async fn delete(&self, _id: Uuid) -> Result<bool, DatabaseError> {
            unavailable()
        }
    }

    fn failing_service() -> AuthService {
        AuthService::new(Arc::new(FailingUserStore), &jwt_settings(), 4)
    }

    /// Status and client message the error would be rendered with
    fn rendered(err: &AppError) -> (StatusCode, String) {
        let (status, body) = <AppError as ErrorHandler>::error_response(err, "req-test");
        (status, body.message)
    }

    // --- Guard ---

    #[tokio::test]
    async fn authenticate_resolves_user_for_valid_token() {
        let (service, _) = service();
        let issued = registered(&service).await;

        let user = service
            .authenticate(Some(&bearer(&issued.access_token)))
            .await
            .expect("Guard rejected a valid token");

        assert_eq!(user.id, issued.user.id);
    }

    #[tokio::test]
    async fn authenticate_rejects_missing_header_and_credential() {
        let (service, _) = service();

        assert_auth_error(service.authenticate(None).await, AuthError::MissingCredential);
        assert_auth_error(
            service.authenticate(Some("Bearer")).await,
            AuthError::MissingCredential,
        );
        assert_auth_error(service.authenticate(Some("")).await, AuthError::MissingCredential);
    }

    #[tokio::test]
    async fn authenticate_rejects_bad_tokens() {
        let (service, _) = service();
        let issued = registered(&service).await;

        assert_auth_error(
            service.authenticate(Some("Bearer garbage")).await,
            AuthError::InvalidToken(TokenError::Malformed),
        );

        let expired = service
            .codec()
            .encode(&issued.user.id.to_string(), -5)
            .unwrap();
        assert_auth_error(
            service.authenticate(Some(&bearer(&expired))).await,
            AuthError::InvalidToken(TokenError::Expired),
        );

        let foreign = TokenCodec::new(b"another-secret-another-secret-xx")
            .encode(&issued.user.id.to_string(), 3600)
            .unwrap();
        assert_auth_error(
            service.authenticate(Some(&bearer(&foreign))).await,
            AuthError::InvalidToken(TokenError::InvalidSignature),
        );
    }

    #[tokio::test]
    async fn authenticate_rejects_unknown_subject() {
        let (service, _) = service();

        let unknown = service.codec().encode(&Uuid::new_v4().to_string(), 3600).unwrap();
        assert_auth_error(
            service.authenticate(Some(&bearer(&unknown))).await,
            AuthError::UserNotFound,
        );

        let not_uuid = service.codec().encode("65f1c0ffee", 3600).unwrap();
        assert_auth_error(
            service.authenticate(Some(&bearer(&not_uuid))).await,
            AuthError::UserNotFound,
        );
    }

    #[tokio::test]
    async fn authenticate_rejects_soft_deleted_user() {
        let (service, store) = service();
        let issued = registered(&service).await;
        store.soft_delete(issued.user.id).await.unwrap();

        assert_auth_error(
            service.authenticate(Some(&bearer(&issued.access_token))).await,
            AuthError::UserNotFound,
        );
    }

    // --- Refresh ---

    #[tokio::test]
    async fn refresh_issues_access_token_without_rotating() {
        let (service, store) = service();
        let issued = registered(&service).await;

        let first = service.refresh(Some(&issued.refresh_token)).await.unwrap();
        let second = service.refresh(Some(&issued.refresh_token)).await.unwrap();

        assert_ne!(first, second);
        for token in [&first, &second] {
            let user = service.authenticate(Some(&bearer(token))).await.unwrap();
            assert_eq!(user.id, issued.user.id);
        }

        let stored = store.get(issued.user.id).await.unwrap().refresh_token;
        assert_eq!(stored, Some(hash_token(&issued.refresh_token)));
    }

    #[tokio::test]
    async fn refresh_requires_token() {
        let (service, _) = service();

        assert_auth_error(service.refresh(None).await, AuthError::MissingRefreshToken);
        assert_auth_error(service.refresh(Some("")).await, AuthError::MissingRefreshToken);
    }

    #[tokio::test]
    async fn refresh_rejects_undecodable_token() {
        let (service, _) = service();
        let issued = registered(&service).await;

        assert_auth_error(
            service.refresh(Some("garbage")).await,
            AuthError::InvalidRefreshToken(TokenError::Malformed),
        );

        let expired = service
            .codec()
            .encode(&issued.user.id.to_string(), -5)
            .unwrap();
        assert_auth_error(
            service.refresh(Some(&expired)).await,
            AuthError::InvalidRefreshToken(TokenError::Expired),
        );
    }

    #[tokio::test]
    async fn refresh_rejects_well_signed_token_that_is_not_stored() {
        let (service, _) = service();
        let issued = registered(&service).await;

        let other = service
            .codec()
            .encode(&issued.user.id.to_string(), 604800)
            .unwrap();
        assert_auth_error(service.refresh(Some(&other)).await, AuthError::RefreshMismatch);

        let orphan = service.codec().encode(&Uuid::new_v4().to_string(), 604800).unwrap();
        assert_auth_error(service.refresh(Some(&orphan)).await, AuthError::RefreshMismatch);
    }

    #[tokio::test]
    async fn refresh_treats_non_uuid_subject_as_unreadable() {
        let (service, _) = service();

        let token = service.codec().encode("65f1c0ffee", 604800).unwrap();
        let result = service.refresh(Some(&token)).await;

        assert_auth_error(result, AuthError::InvalidRefreshToken(TokenError::Malformed));
    }

    #[tokio::test]
    async fn refresh_store_failure_is_reported_as_invalid_refresh_token() {
        let service = failing_service();
        let token = service
            .codec()
            .encode(&Uuid::new_v4().to_string(), 604800)
            .unwrap();

        let err = service.refresh(Some(&token)).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::RefreshLookupFailed)));

        let (status, message) = rendered(&err);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(message, "Invalid or expired refresh token");
    }

    #[tokio::test]
    async fn login_invalidates_previous_refresh_token() {
        let (service, _) = service();
        let first = registered(&service).await;

        let second = service
            .login(Some("johndoe1"), Some("password123"))
            .await
            .unwrap();

        assert_auth_error(
            service.refresh(Some(&first.refresh_token)).await,
            AuthError::RefreshMismatch,
        );
        assert!(service.refresh(Some(&second.refresh_token)).await.is_ok());
    }

    // --- Logout ---

    #[tokio::test]
    async fn logout_clears_refresh_token() {
        let (service, store) = service();
        let issued = registered(&service).await;

        service.logout(issued.user.id).await.unwrap();

        assert!(store.get(issued.user.id).await.unwrap().refresh_token.is_none());
        assert_auth_error(
            service.refresh(Some(&issued.refresh_token)).await,
            AuthError::RefreshMismatch,
        );
    }

    #[tokio::test]
    async fn logout_reports_missing_user() {
        let (service, _) = service();

        match service.logout(Uuid::new_v4()).await {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "User not found"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn logout_store_failure_is_internal_error_without_detail() {
        let service = failing_service();

        let err = service.logout(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::Database(DatabaseError::ConnectionPool(_))));

        let (status, message) = rendered(&err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");
        assert!(!message.contains("connection refused"));
    }

    #[tokio::test]
    async fn authenticate_store_failure_is_internal_error() {
        let service = failing_service();
        let token = service
            .codec()
            .encode(&Uuid::new_v4().to_string(), 3600)
            .unwrap();

        let err = service.authenticate(Some(&bearer(&token))).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(
            rendered(&err),
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
        );
    }

    #[tokio::test]
    async fn register_and_login_store_failures_are_internal_errors() {
        let service = failing_service();

        let register = service
            .register(Some("John Doe"), Some("johndoe1"), Some("password123"))
            .await;
        assert!(matches!(register, Err(AppError::Database(_))));

        let login = service.login(Some("johndoe1"), Some("password123")).await;
        assert!(matches!(login, Err(AppError::Database(_))));
    }

    // --- Register / login ---

    #[tokio::test]
    async fn register_stores_refresh_digest() {
        let (service, store) = service();
        let issued = registered(&service).await;

        let stored = store.get(issued.user.id).await.unwrap();
        assert_eq!(stored.full_name, "John Doe");
        assert_eq!(stored.refresh_token, Some(hash_token(&issued.refresh_token)));
        assert_ne!(stored.password_hash, "password123");
    }

    #[tokio::test]
    async fn register_reports_first_failing_field() {
        let (service, _) = service();
        registered(&service).await;

        let cases = [
            ((None, Some("janedoe1"), Some("password123")), "Full name is required"),
            ((Some("Jo"), Some("short"), Some("short")), "Full name minimum 3 characters"),
            ((Some("Jane"), Some("short"), Some("short")), "Username minimum 8 characters"),
            ((Some("Jane"), Some("johndoe1"), Some("short")), "Username already used"),
            ((Some("Jane"), Some("janedoe1"), None), "Password is required"),
            ((Some("Jane"), Some("janedoe1"), Some("short")), "Password minimum 8 characters"),
        ];

        for ((full_name, username, password), expected) in cases {
            match service.register(full_name, username, password).await {
                Err(AppError::Validation(e)) => assert_eq!(e.to_string(), expected),
                other => panic!("Expected '{}', got {:?}", expected, other.map(|t| t.user.id)),
            }
        }
    }

    #[tokio::test]
    async fn login_rejects_unknown_user_and_wrong_password_alike() {
        let (service, _) = service();
        registered(&service).await;

        assert_auth_error(
            service.login(Some("nobody123"), Some("password123")).await,
            AuthError::InvalidCredentials,
        );
        assert_auth_error(
            service.login(Some("johndoe1"), Some("wrongpassword")).await,
            AuthError::InvalidCredentials,
        );
    }

    // --- Password change ---

    #[tokio::test]
    async fn change_password_checks_current_password() {
        let (service, _) = service();
        let issued = registered(&service).await;

        assert_auth_error(
            service
                .change_password(&issued.user, Some("wrongpassword"), Some("newpassword1"))
                .await,
            AuthError::WrongPassword,
        );

        service
            .change_password(&issued.user, Some("password123"), Some("newpassword1"))
            .await
            .unwrap();

        assert!(service.login(Some("johndoe1"), Some("newpassword1")).await.is_ok());
        assert_auth_error(
            service.login(Some("johndoe1"), Some("password123")).await,
            AuthError::InvalidCredentials,
        );
    }
}
