//! Persistence seams for users and profiles.
//!
//! Handlers only see these traits; `AppState` decides at start-up whether
//! they are backed by Postgres or by the in-process [`MemoryStore`].

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};
use crate::profiles::model::Profile;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    EmailTaken,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Turns the current profile (if any) into the one to persist. Returning
/// `None` leaves the stored profile untouched.
pub type ProfileEdit = Box<dyn FnOnce(Option<Profile>) -> Option<Profile> + Send>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_many(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;
    /// Fails with [`StoreError::EmailTaken`] when the email is already used.
    async fn create(&self, user: NewUser) -> StoreResult<User>;
    /// Also drops the user's profile.
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;
    /// All profiles, oldest first.
    async fn list(&self) -> StoreResult<Vec<Profile>>;
    /// Read-modify-write of one user's profile. Concurrent edits of the same
    /// profile are serialized. Yields `None` without calling `edit` when the
    /// owning user does not exist.
    async fn update_by_user(&self, user_id: Uuid, edit: ProfileEdit) -> StoreResult<Option<Profile>>;
    async fn delete_by_user(&self, user_id: Uuid) -> StoreResult<()>;
}
