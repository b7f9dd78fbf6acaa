//! User persistence
//!
//! Handlers depend on the `UserStore` trait; `PgUserStore` backs it with
//! Postgres and `InMemoryUserStore` with a map for development and tests.

mod memory;
mod postgres;

pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;

/// Stored user record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub username: String,
    pub password_hash: String,
    /// SHA-256 digest of the currently valid refresh token
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set while the user sits in the trash
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Fields supplied at registration
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub username: String,
    pub password_hash: String,
}

/// Lookups ignore soft-deleted users unless the method says otherwise.
/// Mutators return `false` when no matching row was changed.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;

    /// Includes soft-deleted users, since usernames stay reserved while trashed
    async fn username_exists(&self, username: &str) -> Result<bool, DatabaseError>;

    /// # Errors
    /// `UniqueConstraintViolation` when the username is taken
    async fn insert(&self, user: NewUser) -> Result<User, DatabaseError>;

    /// Store or clear the refresh token digest
    async fn set_refresh_token(
        &self,
        id: Uuid,
        token_hash: Option<&str>,
    ) -> Result<bool, DatabaseError>;

    async fn set_password_hash(&self, id: Uuid, password_hash: &str)
        -> Result<bool, DatabaseError>;

    async fn list_active(&self) -> Result<Vec<User>, DatabaseError>;

    async fn list_deleted(&self) -> Result<Vec<User>, DatabaseError>;

    /// Move an active user to the trash, clearing its refresh token
    async fn soft_delete(&self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Bring a trashed user back
    async fn restore(&self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Remove a user permanently, trashed or not
    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError>;
}
