//! End-to-end router tests over the in-memory repositories.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use ideaboard_api::{router, AppState};
use ideaboard_db::memory::{MemoryDatabase, MemoryObjectStore};

const FILES_URL: &str = "http://files.test/files";

fn app_with_store() -> (Router, Arc<MemoryObjectStore>) {
    let db = MemoryDatabase::new();
    let store = Arc::new(MemoryObjectStore::new(FILES_URL));
    let state = AppState {
        tags: Arc::new(db.tags),
        ideas: Arc::new(db.ideas),
        users: Arc::new(db.users),
        groups: Arc::new(db.groups),
        feedbacks: Arc::new(db.feedbacks),
        files: store.clone(),
        pool: None,
        max_upload_bytes: 1024 * 1024,
    };
    (router(state), store)
}

fn app() -> Router {
    app_with_store().0
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_user(app: &Router, id: &str) {
    let (status, _) = send(
        app,
        Method::POST,
        "/users",
        Some(json!({
            "id": id,
            "name": "Alice",
            "email": "alice@example.com",
            "role": "member"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn create_idea(app: &Router, user_id: &str, access: &str, tags: &[&str]) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/ideas",
        Some(json!({
            "title": "Standing desks",
            "content": "For everyone",
            "user_id": user_id,
            "access": access,
            "tags": tags
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_create_idea_returns_tags() {
    let app = app();
    create_user(&app, "alice").await;
    let id = create_idea(&app, "alice", "public", &["y", "x", "x"]).await;

    let (status, body) = send(&app, Method::GET, &format!("/ideas/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tags"], json!(["x", "y"]));
    assert_eq!(body["access"], "public");
    assert_eq!(body["upvotes"], 0);
}

#[tokio::test]
async fn test_idea_without_tags_has_empty_array() {
    let app = app();
    create_user(&app, "alice").await;
    let id = create_idea(&app, "alice", "public", &[]).await;

    let (_, body) = send(&app, Method::GET, &format!("/ideas/{}", id), None).await;
    assert_eq!(body["tags"], json!([]));
}

#[tokio::test]
async fn test_votes_are_independent_counters() {
    let app = app();
    create_user(&app, "alice").await;
    let id = create_idea(&app, "alice", "public", &[]).await;

    let (status, body) = send(&app, Method::POST, &format!("/ideas/up/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["upvotes"], 1);

    let (_, body) = send(&app, Method::POST, &format!("/ideas/down/{}", id), None).await;
    assert_eq!(body["upvotes"], 1);
    assert_eq!(body["downvotes"], 1);
}

#[tokio::test]
async fn test_remove_vote_returns_empty_ok() {
    let app = app();
    create_user(&app, "alice").await;
    let id = create_idea(&app, "alice", "public", &[]).await;

    let (status, body) = send(&app, Method::DELETE, &format!("/ideas/up/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);

    // Counters are not clamped at zero.
    let (_, body) = send(&app, Method::GET, &format!("/ideas/{}", id), None).await;
    assert_eq!(body["upvotes"], -1);
}

#[tokio::test]
async fn test_non_numeric_id_is_validation_error() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/ideas/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["name"], "ValidationError");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_unknown_body_field_is_rejected() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/users",
        Some(json!({
            "id": "bob",
            "name": "Bob",
            "email": "bob@example.com",
            "role": "member",
            "nickname": "b"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["name"], "ValidationError");
}

#[tokio::test]
async fn test_unknown_sort_column_is_rejected() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/ideas?sort=password", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["name"], "ValidationError");

    let (status, _) = send(&app, Method::GET, "/ideas?sort=upvotes&order=desc", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_idea_is_not_found() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/ideas/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["name"], "NotFound");

    let (status, _) = send(&app, Method::POST, "/ideas/up/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_idea_for_unknown_user_is_constraint_error() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/ideas",
        Some(json!({
            "title": "Orphan",
            "content": "No owner",
            "user_id": "ghost",
            "access": "public"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["name"], "ConstraintViolation");
}

#[tokio::test]
async fn test_blank_tag_name_is_rejected() {
    let app = app();
    create_user(&app, "alice").await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/ideas",
        Some(json!({
            "title": "t",
            "content": "c",
            "user_id": "alice",
            "access": "public",
            "tags": ["  "]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["name"], "ValidationError");
}

#[tokio::test]
async fn test_access_filter_lists_scope_and_public() {
    let app = app();
    create_user(&app, "alice").await;
    create_idea(&app, "alice", "public", &[]).await;
    create_idea(&app, "alice", "private:alice", &[]).await;
    create_idea(&app, "alice", "group:7", &[]).await;

    let (_, body) = send(&app, Method::GET, "/ideas?access=private:alice", None).await;
    let mut access: Vec<String> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["access"].as_str().unwrap().to_string())
        .collect();
    access.sort();
    assert_eq!(access, vec!["private:alice", "public"]);

    let (_, body) = send(&app, Method::GET, "/ideas?access=public", None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_tag_route_links_and_unlinks() {
    let app = app();
    create_user(&app, "alice").await;
    let id = create_idea(&app, "alice", "public", &["a"]).await;

    let (status, body) = send(&app, Method::POST, &format!("/ideas/{}/b", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tags"], json!(["a", "b"]));

    let (status, _) = send(&app, Method::DELETE, &format!("/ideas/{}/a", id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, "/ideas?tag=b", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["tags"], json!(["b"]));

    let (_, body) = send(&app, Method::GET, "/tags/a", None).await;
    assert_eq!(body["name"], "a");
}

#[tokio::test]
async fn test_user_ideas_route() {
    let app = app();
    create_user(&app, "alice").await;
    create_user(&app, "bob").await;
    create_idea(&app, "alice", "public", &[]).await;
    create_idea(&app, "bob", "public", &[]).await;

    let (status, body) = send(&app, Method::GET, "/ideas/user/bob", None).await;
    assert_eq!(status, StatusCode::OK);
    let ideas = body.as_array().unwrap();
    assert_eq!(ideas.len(), 1);
    assert_eq!(ideas[0]["user_id"], "bob");
}

#[tokio::test]
async fn test_group_membership_routes() {
    let app = app();
    create_user(&app, "alice").await;
    let (status, group) = send(
        &app,
        Method::POST,
        "/groups",
        Some(json!({ "title": "Platform", "tags": ["infra"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = group["id"].as_i64().unwrap();
    assert_eq!(group["tags"], json!(["infra"]));

    let (status, body) = send(&app, Method::POST, &format!("/groups/{}/alice", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_ids"], json!(["alice"]));

    let (_, body) = send(&app, Method::POST, &format!("/groups/like/{}", id), None).await;
    assert_eq!(body["likes"], 1);

    let (_, body) = send(&app, Method::DELETE, &format!("/groups/{}/alice", id), None).await;
    assert_eq!(body["user_ids"], json!([]));
}

#[tokio::test]
async fn test_feedback_lifecycle() {
    let app = app();
    create_user(&app, "alice").await;
    let idea_id = create_idea(&app, "alice", "public", &[]).await;

    let (status, feedback) = send(
        &app,
        Method::POST,
        "/feedbacks",
        Some(json!({
            "idea_id": idea_id,
            "user_id": "alice",
            "content": "Love it"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let fid = feedback["id"].as_i64().unwrap();

    let (_, body) = send(&app, Method::GET, &format!("/ideas/{}/feedbacks", idea_id), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(&app, Method::POST, &format!("/feedbacks/up/{}", fid), None).await;
    assert_eq!(body["upvotes"], 1);

    let (status, _) = send(&app, Method::DELETE, &format!("/ideas/{}", idea_id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, &format!("/feedbacks/{}", fid), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn multipart_request(uri: &str, field: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let boundary = "ideaboardboundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"{n}\"\r\nContent-Type: text/plain\r\n\r\n",
            b = boundary,
            f = field,
            n = filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_upload_download_and_remove_file() {
    let (app, store) = app_with_store();
    create_user(&app, "alice").await;
    let id = create_idea(&app, "alice", "public", &[]).await;

    let response = app
        .clone()
        .oneshot(multipart_request(
            &format!("/ideas/file/{}", id),
            "file",
            "notes.txt",
            b"hello",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let idea: Value = serde_json::from_slice(&bytes).unwrap();
    let expected_url = format!("{}/{}/notes.txt", FILES_URL, id);
    assert_eq!(idea["files_url"], json!([expected_url]));
    assert_eq!(store.keys().await, vec![format!("{}/notes.txt", id)]);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/files/{}/notes.txt", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "text/plain"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"hello");

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/ideas/file/{}", id),
        Some(json!({ "filename": "notes.txt" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["files_url"], json!([]));
    assert!(store.keys().await.is_empty());
}

#[tokio::test]
async fn test_upload_without_file_field_is_rejected() {
    let app = app();
    create_user(&app, "alice").await;
    let id = create_idea(&app, "alice", "public", &[]).await;

    let response = app
        .clone()
        .oneshot(multipart_request(
            &format!("/ideas/file/{}", id),
            "attachment",
            "notes.txt",
            b"hello",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_to_missing_idea_is_not_found() {
    let app = app();
    let response = app
        .clone()
        .oneshot(multipart_request("/ideas/file/42", "file", "a.txt", b"x"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_without_database() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "not_configured");
    assert_eq!(body["status"], "healthy");
}
