use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ProfileEdit, ProfileStore, StoreError, StoreResult, UserStore};
use crate::auth::repo_types::{NewUser, User};
use crate::profiles::model::Profile;

/// Process-local store. Data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    // keyed by owning user id
    profiles: RwLock<HashMap<Uuid, Profile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::EmailTaken);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            avatar: user.avatar,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        // profiles before users, same order as update_by_user
        let mut profiles = self.profiles.write().await;
        self.users.write().await.remove(&id);
        profiles.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_by_user(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.profiles.read().await.get(&user_id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<Profile>> {
        let mut all: Vec<Profile> = self.profiles.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn update_by_user(&self, user_id: Uuid, edit: ProfileEdit) -> StoreResult<Option<Profile>> {
        let mut profiles = self.profiles.write().await;
        if !self.users.read().await.contains_key(&user_id) {
            return Ok(None);
        }
        let next = edit(profiles.get(&user_id).cloned());
        if let Some(profile) = &next {
            profiles.insert(user_id, profile.clone());
        }
        Ok(next)
    }

    async fn delete_by_user(&self, user_id: Uuid) -> StoreResult<()> {
        self.profiles.write().await.remove(&user_id);
        Ok(())
    }
}
