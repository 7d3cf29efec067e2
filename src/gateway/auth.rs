//! Admin authorization
//!
//! Each admin action has a persisted role allow-list; an empty list falls
//! back to requiring the platform administrator flag. Checks run before any
//! mutating side effect.

use crate::error::{Result, ScrimError};
use crate::store::MatchStore;
use crate::types::Actor;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for authorizing admin actions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Ok when the actor may perform the action; `PermissionDenied` otherwise
    async fn authorize(&self, actor: &Actor, action: &str) -> Result<()>;
}

/// Authorizer backed by the per-action allow-lists in the store
pub struct StoreRoleAuthorizer {
    store: Arc<dyn MatchStore>,
}

impl StoreRoleAuthorizer {
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Authorizer for StoreRoleAuthorizer {
    async fn authorize(&self, actor: &Actor, action: &str) -> Result<()> {
        let allowed_roles = self.store.roles_for_action(action).await?;

        let permitted = if allowed_roles.is_empty() {
            actor.is_admin
        } else {
            actor.roles.iter().any(|role| allowed_roles.contains(role))
        };

        if permitted {
            Ok(())
        } else {
            Err(ScrimError::PermissionDenied {
                action: action.to_string(),
            }
            .into())
        }
    }
}
