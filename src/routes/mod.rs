mod auth;
mod health_check;
mod users;

pub use auth::{login, logout, refresh, register};
pub use health_check::{health_check, not_found};
pub use users::{
    change_password, force_delete, get_info, list_stored, list_trash, restore, soft_delete,
};

use serde::Serialize;

use crate::store::User;

/// Public view of a user; never includes the password hash or token digest
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub full_name: String,
    pub username: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            full_name: user.full_name.clone(),
            username: user.username.clone(),
            created_at: user.created_at.to_rfc3339(),
            deleted_at: user.deleted_at.map(|at| at.to_rfc3339()),
        }
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
