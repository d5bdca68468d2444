use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest, TokenResponse},
        jwt::AuthUser,
        services::AccountService,
    },
    error::AppError,
    state::AppState,
    validation::ValidatedJson,
};

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users", post(register))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth", get(get_me).post(login))
}

#[instrument(skip(accounts, payload))]
pub async fn register(
    State(accounts): State<AccountService>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = accounts.register(payload).await?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(accounts, payload))]
pub async fn login(
    State(accounts): State<AccountService>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = accounts.login(payload).await?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(accounts))]
pub async fn get_me(
    State(accounts): State<AccountService>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    Ok(Json(accounts.current_user(user_id).await?))
}
