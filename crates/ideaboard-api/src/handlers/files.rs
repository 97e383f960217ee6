//! Idea attachment handlers.
//!
//! An upload writes the object first and then appends its public URL to the
//! idea; a removal deletes the object first and then drops the URL. A failure
//! between the two steps is logged and leaves the stores diverged.

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};

use ideaboard_core::Idea;
use ideaboard_db::object_key;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

/// Multipart field carrying the upload.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoveFileRequest {
    pub filename: String,
}

struct Upload {
    filename: String,
    content_type: String,
    data: Vec<u8>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::Validation("file field has no file name".to_string()))?;
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&filename)
                    .first_or_octet_stream()
                    .to_string()
            });
        let data = field.bytes().await?.to_vec();
        return Ok(Upload {
            filename,
            content_type,
            data,
        });
    }
    Err(ApiError::Validation(format!(
        "multipart field '{}' is required",
        FILE_FIELD
    )))
}

async fn require_idea(state: &AppState, id: i64) -> Result<(), ApiError> {
    if state.ideas.exists(id).await? {
        Ok(())
    } else {
        Err(ApiError::not_found(format!("Idea {} not found", id)))
    }
}

pub async fn upload_file(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Idea>, ApiError> {
    require_idea(&state, id).await?;
    let upload = read_upload(multipart?).await?;
    let key = object_key(id, &upload.filename)?;

    state
        .files
        .put(&key, &upload.data, &upload.content_type)
        .await?;
    let url = state.files.public_url(&key);

    let idea = state.ideas.append_file(id, &url).await.map_err(|e| {
        warn!(
            subsystem = "api",
            op = "append_file",
            idea_id = id,
            object_key = %key,
            error = %e,
            "Object stored but URL not recorded"
        );
        e
    })?;

    info!(
        subsystem = "api",
        op = "upload_file",
        idea_id = id,
        object_key = %key,
        size = upload.data.len(),
        "File attached"
    );
    Ok(Json(idea))
}

pub async fn remove_file(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<RemoveFileRequest>,
) -> Result<Json<Idea>, ApiError> {
    require_idea(&state, id).await?;
    let key = object_key(id, &body.filename)?;

    state.files.delete(&key).await?;
    let url = state.files.public_url(&key);

    let idea = state.ideas.remove_file(id, &url).await.map_err(|e| {
        warn!(
            subsystem = "api",
            op = "remove_file",
            idea_id = id,
            object_key = %key,
            error = %e,
            "Object deleted but URL still recorded"
        );
        e
    })?;
    Ok(Json(idea))
}

pub async fn download_file(
    State(state): State<AppState>,
    ApiPath((idea_id, filename)): ApiPath<(i64, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let key = object_key(idea_id, &filename)?;
    let object = state
        .files
        .get(&key)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("File '{}' not found", key)))?;

    let content_type = object.content_type.unwrap_or_else(|| {
        mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .to_string()
    });
    Ok(([(header::CONTENT_TYPE, content_type)], object.data))
}
