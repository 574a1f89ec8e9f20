use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::models::directory_user::DirectoryUser;
use crate::utils::telegram_auth::VerifiedIdentity;

/// Where verified identities are recorded, keyed by Telegram user id.
#[cfg_attr(test, mockall::automock)]
pub trait UserStore: Send + Sync {
    fn upsert(&self, identity: &VerifiedIdentity, seen_at: DateTime<Utc>) -> DirectoryUser;
    fn get(&self, telegram_id: i64) -> Option<DirectoryUser>;
    fn list(&self) -> Vec<DirectoryUser>;
}

#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<i64, DirectoryUser>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUserStore {
    fn upsert(&self, identity: &VerifiedIdentity, seen_at: DateTime<Utc>) -> DirectoryUser {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        let entry = users
            .entry(identity.id)
            .and_modify(|user| {
                user.username = identity.username.clone();
                user.last_seen_at = seen_at;
            })
            .or_insert_with(|| DirectoryUser {
                telegram_id: identity.id,
                username: identity.username.clone(),
                first_seen_at: seen_at,
                last_seen_at: seen_at,
            });
        entry.clone()
    }

    fn get(&self, telegram_id: i64) -> Option<DirectoryUser> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&telegram_id)
            .cloned()
    }

    fn list(&self) -> Vec<DirectoryUser> {
        let mut users: Vec<DirectoryUser> = self
            .users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        users.sort_by_key(|user| user.telegram_id);
        users
    }
}
