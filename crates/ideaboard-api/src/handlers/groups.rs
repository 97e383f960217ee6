//! Group HTTP handlers: CRUD, member lists, likes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use ideaboard_core::{
    CreateGroupRequest, Group, GroupWithTags, ListGroupsQuery, UpdateGroupRequest, VoteChange,
};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

pub async fn list_groups(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListGroupsQuery>,
) -> Result<Json<Vec<GroupWithTags>>, ApiError> {
    Ok(Json(state.groups.list(query).await?))
}

pub async fn create_group(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupWithTags>), ApiError> {
    body.validate()?;
    Ok((StatusCode::CREATED, Json(state.groups.create(body).await?)))
}

pub async fn get_group(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<GroupWithTags>, ApiError> {
    state
        .groups
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Group {} not found", id)))
}

pub async fn update_group(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateGroupRequest>,
) -> Result<Json<GroupWithTags>, ApiError> {
    body.validate()?;
    Ok(Json(state.groups.update(id, body).await?))
}

pub async fn delete_group(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.groups.delete(id).await?;
    Ok(StatusCode::OK)
}

pub async fn add_group_member(
    State(state): State<AppState>,
    ApiPath((id, user_id)): ApiPath<(i64, String)>,
) -> Result<Json<Group>, ApiError> {
    Ok(Json(state.groups.add_member(id, &user_id).await?))
}

pub async fn remove_group_member(
    State(state): State<AppState>,
    ApiPath((id, user_id)): ApiPath<(i64, String)>,
) -> Result<Json<Group>, ApiError> {
    Ok(Json(state.groups.remove_member(id, &user_id).await?))
}

pub async fn like_group(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Group>, ApiError> {
    Ok(Json(state.groups.like(id, VoteChange::Add).await?))
}

pub async fn unlike_group(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.groups.like(id, VoteChange::Remove).await?;
    Ok(StatusCode::OK)
}
