use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ServiceError, ServiceResult};
use crate::models::{Role, User};
use crate::storage::{Store, Transaction};

/// The user on whose behalf an operation runs. `role` is what the caller
/// claims; services authorize against the stored user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Actor {
            user_id: user_id.into(),
            role,
        }
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor::new(user.id.clone(), user.role)
    }
}

#[async_trait]
pub trait UserLookup: Send + Sync {
    /// Fails with `NotFound` for unknown ids.
    async fn find_user(&self, id: &str) -> ServiceResult<User>;
}

/// Resolves users from the `users` collection of a store.
pub struct StoreUsers<S> {
    store: Arc<S>,
}

impl<S: Store> StoreUsers<S> {
    pub fn new(store: Arc<S>) -> Self {
        StoreUsers { store }
    }
}

#[async_trait]
impl<S: Store> UserLookup for StoreUsers<S> {
    async fn find_user(&self, id: &str) -> ServiceResult<User> {
        let mut tx = self.store.begin_read().await?;
        tx.find_by_id::<User>(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("user {}", id)))
    }
}
