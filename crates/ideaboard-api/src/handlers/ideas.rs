//! Idea HTTP handlers: CRUD, votes, and per-idea tag links.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use ideaboard_core::{
    CreateIdeaRequest, Feedback, Idea, IdeaWithTags, ListIdeasQuery, TagTarget,
    UpdateIdeaRequest, VoteChange, VoteDirection,
};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

async fn fetch_idea(state: &AppState, id: i64) -> Result<IdeaWithTags, ApiError> {
    state
        .ideas
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Idea {} not found", id)))
}

pub async fn list_ideas(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListIdeasQuery>,
) -> Result<Json<Vec<IdeaWithTags>>, ApiError> {
    Ok(Json(state.ideas.list(query).await?))
}

/// Ideas owned by one user. Other list options are not accepted on this
/// route.
pub async fn list_user_ideas(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<String>,
) -> Result<Json<Vec<IdeaWithTags>>, ApiError> {
    let query = ListIdeasQuery {
        user_id: Some(user_id),
        ..Default::default()
    };
    Ok(Json(state.ideas.list(query).await?))
}

pub async fn create_idea(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateIdeaRequest>,
) -> Result<(StatusCode, Json<IdeaWithTags>), ApiError> {
    body.validate()?;
    let idea = state.ideas.create(body).await?;
    info!(subsystem = "api", op = "create_idea", idea_id = idea.idea.id, "Idea created");
    Ok((StatusCode::CREATED, Json(idea)))
}

pub async fn get_idea(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<IdeaWithTags>, ApiError> {
    Ok(Json(fetch_idea(&state, id).await?))
}

pub async fn update_idea(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateIdeaRequest>,
) -> Result<Json<IdeaWithTags>, ApiError> {
    body.validate()?;
    Ok(Json(state.ideas.update(id, body).await?))
}

pub async fn delete_idea(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.ideas.delete(id).await?;
    Ok(StatusCode::OK)
}

pub async fn list_idea_feedbacks(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<Feedback>>, ApiError> {
    if !state.ideas.exists(id).await? {
        return Err(ApiError::not_found(format!("Idea {} not found", id)));
    }
    Ok(Json(state.feedbacks.list_for_idea(id).await?))
}

pub async fn upvote_idea(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Idea>, ApiError> {
    Ok(Json(state.ideas.vote(id, VoteDirection::Up, VoteChange::Add).await?))
}

pub async fn remove_upvote_idea(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.ideas.vote(id, VoteDirection::Up, VoteChange::Remove).await?;
    Ok(StatusCode::OK)
}

pub async fn downvote_idea(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Idea>, ApiError> {
    Ok(Json(state.ideas.vote(id, VoteDirection::Down, VoteChange::Add).await?))
}

pub async fn remove_downvote_idea(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.ideas.vote(id, VoteDirection::Down, VoteChange::Remove).await?;
    Ok(StatusCode::OK)
}

pub async fn link_idea_tag(
    State(state): State<AppState>,
    ApiPath((id, tag)): ApiPath<(i64, String)>,
) -> Result<Json<IdeaWithTags>, ApiError> {
    state.tags.link(&TagTarget::Idea(id), &[tag]).await?;
    Ok(Json(fetch_idea(&state, id).await?))
}

pub async fn unlink_idea_tag(
    State(state): State<AppState>,
    ApiPath((id, tag)): ApiPath<(i64, String)>,
) -> Result<StatusCode, ApiError> {
    state.tags.unlink(&TagTarget::Idea(id), &tag).await?;
    Ok(StatusCode::OK)
}
