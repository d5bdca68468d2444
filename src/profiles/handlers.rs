use axum::{
    extract::{Path, State},
    routing::{delete, get, put},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    error::AppError,
    github::RepoSummary,
    profiles::{
        dto::{EducationInput, ExperienceInput, ProfileInput},
        model::{Owner, Profile},
        services::ProfileService,
    },
    state::AppState,
    validation::ValidatedJson,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/profile/me", get(get_my_profile))
        .route("/profile/user/:user_id", get(get_profile_by_user))
        .route("/profile/github/:username", get(get_github_repos))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(list_profiles).post(upsert_profile).delete(delete_account),
        )
        .route("/profile/experience", put(add_experience))
        .route("/profile/experience/:exp_id", delete(remove_experience))
        .route("/profile/education", put(add_education))
        .route("/profile/education/:edu_id", delete(remove_education))
}

#[instrument(skip(profiles))]
pub async fn get_my_profile(
    State(profiles): State<ProfileService>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Profile<Owner>>, AppError> {
    Ok(Json(profiles.get_own(user_id).await?))
}

#[instrument(skip(profiles, input))]
pub async fn upsert_profile(
    State(profiles): State<ProfileService>,
    AuthUser(user_id): AuthUser,
    ValidatedJson(input): ValidatedJson<ProfileInput>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(profiles.upsert(user_id, input.into()).await?))
}

#[instrument(skip(profiles))]
pub async fn list_profiles(
    State(profiles): State<ProfileService>,
) -> Result<Json<Vec<Profile<Owner>>>, AppError> {
    Ok(Json(profiles.list().await?))
}

#[instrument(skip(profiles))]
pub async fn get_profile_by_user(
    State(profiles): State<ProfileService>,
    Path(user_id): Path<String>,
) -> Result<Json<Profile<Owner>>, AppError> {
    Ok(Json(profiles.get_by_user(&user_id).await?))
}

#[instrument(skip(profiles))]
pub async fn delete_account(
    State(profiles): State<ProfileService>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Value>, AppError> {
    profiles.delete_account(user_id).await?;
    Ok(Json(json!({ "msg": "User deleted" })))
}

#[instrument(skip(profiles, input))]
pub async fn add_experience(
    State(profiles): State<ProfileService>,
    AuthUser(user_id): AuthUser,
    ValidatedJson(input): ValidatedJson<ExperienceInput>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(profiles.add_experience(user_id, input).await?))
}

#[instrument(skip(profiles))]
pub async fn remove_experience(
    State(profiles): State<ProfileService>,
    AuthUser(user_id): AuthUser,
    Path(exp_id): Path<String>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(profiles.remove_experience(user_id, &exp_id).await?))
}

#[instrument(skip(profiles, input))]
pub async fn add_education(
    State(profiles): State<ProfileService>,
    AuthUser(user_id): AuthUser,
    ValidatedJson(input): ValidatedJson<EducationInput>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(profiles.add_education(user_id, input).await?))
}

#[instrument(skip(profiles))]
pub async fn remove_education(
    State(profiles): State<ProfileService>,
    AuthUser(user_id): AuthUser,
    Path(edu_id): Path<String>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(profiles.remove_education(user_id, &edu_id).await?))
}

#[instrument(skip(state))]
pub async fn get_github_repos(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<RepoSummary>>, AppError> {
    Ok(Json(state.github.recent_repos(&username).await?))
}
