//! User HTTP handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use ideaboard_core::{
    CreateUserRequest, ListUsersQuery, TagTarget, UpdateUserRequest, UserWithTags,
};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

async fn fetch_user(state: &AppState, id: &str) -> Result<UserWithTags, ApiError> {
    state
        .users
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User '{}' not found", id)))
}

pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListUsersQuery>,
) -> Result<Json<Vec<UserWithTags>>, ApiError> {
    Ok(Json(state.users.list(query).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserWithTags>), ApiError> {
    body.validate()?;
    let user = state.users.create(body).await?;
    info!(subsystem = "api", op = "create_user", user_id = %user.user.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<UserWithTags>, ApiError> {
    Ok(Json(fetch_user(&state, &id).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserWithTags>, ApiError> {
    body.validate()?;
    Ok(Json(state.users.update(&id, body).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<StatusCode, ApiError> {
    state.users.delete(&id).await?;
    Ok(StatusCode::OK)
}

pub async fn link_user_tag(
    State(state): State<AppState>,
    ApiPath((user_id, tag)): ApiPath<(String, String)>,
) -> Result<Json<UserWithTags>, ApiError> {
    state
        .tags
        .link(&TagTarget::User(user_id.clone()), &[tag])
        .await?;
    Ok(Json(fetch_user(&state, &user_id).await?))
}

pub async fn unlink_user_tag(
    State(state): State<AppState>,
    ApiPath((user_id, tag)): ApiPath<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.tags.unlink(&TagTarget::User(user_id), &tag).await?;
    Ok(StatusCode::OK)
}
