use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest},
        gravatar,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::NewUser,
    },
    error::AppError,
    state::AppState,
    store::UserStore,
};

/// Registration, login and "who am I" on top of the credential store.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl FromRef<AppState> for AccountService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone(), state.jwt.clone())
    }
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        Self { users, keys }
    }

    /// Creates the account and returns a token for it.
    pub async fn register(&self, req: RegisterRequest) -> Result<String, AppError> {
        let email = normalize_email(&req.email);

        if self.users.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AppError::Conflict("User already exists"));
        }

        let password_hash = hash_password(req.password).await?;
        let user = self
            .users
            .create(NewUser {
                name: req.name.trim().to_string(),
                avatar: Some(gravatar::avatar_url(&email)),
                email,
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(self.keys.sign(user.id)?)
    }

    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, req: LoginRequest) -> Result<String, AppError> {
        let email = normalize_email(&req.email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!(email = %email, "login unknown email");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(req.password, user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        info!(user_id = %user.id, "user logged in");
        Ok(self.keys.sign(user.id)?)
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<PublicUser, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(PublicUser::from)
            .ok_or(AppError::Unauthorized("User not found"))
    }
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
