//! Tag HTTP handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use ideaboard_core::{ListTagsQuery, Tag, VoteChange, VoteDirection};

use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery};
use crate::state::AppState;

pub async fn list_tags(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListTagsQuery>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.tags.list(query).await?))
}

pub async fn get_tag(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
) -> Result<Json<Tag>, ApiError> {
    state
        .tags
        .get_by_name(&name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Tag '{}' not found", name)))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
) -> Result<StatusCode, ApiError> {
    state.tags.delete_by_name(&name).await?;
    Ok(StatusCode::OK)
}

pub async fn upvote_tag(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Tag>, ApiError> {
    Ok(Json(state.tags.vote(id, VoteDirection::Up, VoteChange::Add).await?))
}

pub async fn remove_upvote_tag(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.tags.vote(id, VoteDirection::Up, VoteChange::Remove).await?;
    Ok(StatusCode::OK)
}

pub async fn downvote_tag(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Tag>, ApiError> {
    Ok(Json(state.tags.vote(id, VoteDirection::Down, VoteChange::Add).await?))
}

pub async fn remove_downvote_tag(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.tags.vote(id, VoteDirection::Down, VoteChange::Remove).await?;
    Ok(StatusCode::OK)
}
