use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NewUser, User, UserStore};
use crate::error::DatabaseError;

/// Map-backed store. Writes are serialized by the lock.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw record lookup including trashed users
    pub async fn get(&self, id: Uuid) -> Option<User> {
        self.users.read().await.get(&id).cloned()
    }

    async fn update_active<F>(&self, id: Uuid, apply: F) -> bool
    where
        F: FnOnce(&mut User) + Send,
    {
        let mut users = self.users.write().await;
        match users.get_mut(&id).filter(|user| !user.is_deleted()) {
            Some(user) => {
                apply(user);
                user.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    async fn collect<P>(&self, keep: P) -> Vec<User>
    where
        P: Fn(&User) -> bool + Send,
    {
        let mut users: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .filter(|user| keep(user))
            .cloned()
            .collect();
        users.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.username.cmp(&b.username))
        });
        users
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.get(id).await.filter(|user| !user.is_deleted()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.username == username && !user.is_deleted())
            .cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .any(|user| user.username == username))
    }

    async fn insert(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.username == user.username) {
            return Err(DatabaseError::UniqueConstraintViolation(format!(
                "username {} already exists",
                user.username
            )));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            full_name: user.full_name,
            username: user.username,
            password_hash: user.password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        users.insert(created.id, created.clone());

        Ok(created)
    }

    async fn set_refresh_token(
        &self,
        id: Uuid,
        token_hash: Option<&str>,
    ) -> Result<bool, DatabaseError> {
        let token_hash = token_hash.map(str::to_string);
        Ok(self
            .update_active(id, move |user| user.refresh_token = token_hash)
            .await)
    }

    async fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, DatabaseError> {
        let password_hash = password_hash.to_string();
        Ok(self
            .update_active(id, move |user| user.password_hash = password_hash)
            .await)
    }

    async fn list_active(&self) -> Result<Vec<User>, DatabaseError> {
        Ok(self.collect(|user| !user.is_deleted()).await)
    }

    async fn list_deleted(&self) -> Result<Vec<User>, DatabaseError> {
        Ok(self.collect(|user| user.is_deleted()).await)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self
            .update_active(id, |user| {
                user.deleted_at = Some(Utc::now());
                user.refresh_token = None;
            })
            .await)
    }

    async fn restore(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut users = self.users.write().await;
        match users.get_mut(&id).filter(|user| user.is_deleted()) {
            Some(user) => {
                user.deleted_at = None;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}
