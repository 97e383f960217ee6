//! # ideaboard-api
//!
//! HTTP surface for ideaboard: the route table, handlers, and the mapping of
//! domain errors to `{name, message}` responses.
//!
//! [`router`] builds the application from an [`AppState`]; the binary adds
//! CORS from configuration and serves it.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use handlers::{feedbacks, files, groups, health, ideas, tags, users};

pub use config::ApiConfig;
pub use error::ApiError;
pub use state::AppState;

#[derive(Clone, Copy, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Build the application router with tracing, request ids and body limits.
///
/// Static path segments (`up`, `down`, `file`, `user`, `like`) take priority
/// over the `:id` parameter at the same position.
pub fn router(state: AppState) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_check))
        // Ideas
        .route("/ideas", get(ideas::list_ideas).post(ideas::create_idea))
        .route(
            "/ideas/:id",
            get(ideas::get_idea)
                .put(ideas::update_idea)
                .delete(ideas::delete_idea),
        )
        .route("/ideas/:id/feedbacks", get(ideas::list_idea_feedbacks))
        .route(
            "/ideas/:id/:tag",
            post(ideas::link_idea_tag).delete(ideas::unlink_idea_tag),
        )
        .route(
            "/ideas/up/:id",
            post(ideas::upvote_idea).delete(ideas::remove_upvote_idea),
        )
        .route(
            "/ideas/down/:id",
            post(ideas::downvote_idea).delete(ideas::remove_downvote_idea),
        )
        .route(
            "/ideas/file/:id",
            post(files::upload_file).delete(files::remove_file),
        )
        .route("/ideas/user/:user_id", get(ideas::list_user_ideas))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/user/:user_id/:tag",
            post(users::link_user_tag).delete(users::unlink_user_tag),
        )
        // Groups
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route(
            "/groups/:id",
            get(groups::get_group)
                .put(groups::update_group)
                .delete(groups::delete_group),
        )
        .route(
            "/groups/:id/:user_id",
            post(groups::add_group_member).delete(groups::remove_group_member),
        )
        .route(
            "/groups/like/:id",
            post(groups::like_group).delete(groups::unlike_group),
        )
        // Feedbacks
        .route(
            "/feedbacks",
            get(feedbacks::list_feedbacks).post(feedbacks::create_feedback),
        )
        .route(
            "/feedbacks/:id",
            get(feedbacks::get_feedback)
                .put(feedbacks::update_feedback)
                .delete(feedbacks::delete_feedback),
        )
        .route(
            "/feedbacks/up/:id",
            post(feedbacks::upvote_feedback).delete(feedbacks::remove_upvote_feedback),
        )
        .route(
            "/feedbacks/down/:id",
            post(feedbacks::downvote_feedback).delete(feedbacks::remove_downvote_feedback),
        )
        .route(
            "/feedbacks/user/:user_id",
            get(feedbacks::list_user_feedbacks),
        )
        // Tags
        .route("/tags", get(tags::list_tags))
        .route("/tags/:name", get(tags::get_tag).delete(tags::delete_tag))
        .route(
            "/tags/up/:id",
            post(tags::upvote_tag).delete(tags::remove_upvote_tag),
        )
        .route(
            "/tags/down/:id",
            post(tags::downvote_tag).delete(tags::remove_downvote_tag),
        )
        // Attachments
        .route("/files/:idea_id/:filename", get(files::download_file))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state)
}

/// CORS layer for the configured origins. Invalid origins are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600))
}
