//! Feedback HTTP handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use ideaboard_core::{
    CreateFeedbackRequest, Feedback, UpdateFeedbackRequest, VoteChange, VoteDirection,
};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

pub async fn list_feedbacks(
    State(state): State<AppState>,
) -> Result<Json<Vec<Feedback>>, ApiError> {
    Ok(Json(state.feedbacks.list().await?))
}

pub async fn list_user_feedbacks(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<String>,
) -> Result<Json<Vec<Feedback>>, ApiError> {
    Ok(Json(state.feedbacks.list_for_user(&user_id).await?))
}

pub async fn create_feedback(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateFeedbackRequest>,
) -> Result<(StatusCode, Json<Feedback>), ApiError> {
    body.validate()?;
    Ok((StatusCode::CREATED, Json(state.feedbacks.create(body).await?)))
}

pub async fn get_feedback(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Feedback>, ApiError> {
    state
        .feedbacks
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Feedback {} not found", id)))
}

pub async fn update_feedback(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UpdateFeedbackRequest>,
) -> Result<Json<Feedback>, ApiError> {
    body.validate()?;
    Ok(Json(state.feedbacks.update(id, body).await?))
}

pub async fn delete_feedback(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.feedbacks.delete(id).await?;
    Ok(StatusCode::OK)
}

pub async fn upvote_feedback(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Feedback>, ApiError> {
    Ok(Json(
        state
            .feedbacks
            .vote(id, VoteDirection::Up, VoteChange::Add)
            .await?,
    ))
}

pub async fn remove_upvote_feedback(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .feedbacks
        .vote(id, VoteDirection::Up, VoteChange::Remove)
        .await?;
    Ok(StatusCode::OK)
}

pub async fn downvote_feedback(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Feedback>, ApiError> {
    Ok(Json(
        state
            .feedbacks
            .vote(id, VoteDirection::Down, VoteChange::Add)
            .await?,
    ))
}

pub async fn remove_downvote_feedback(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .feedbacks
        .vote(id, VoteDirection::Down, VoteChange::Remove)
        .await?;
    Ok(StatusCode::OK)
}
