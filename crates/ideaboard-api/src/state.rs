//! Shared handler state.

use std::sync::Arc;

use ideaboard_core::{
    FeedbackRepository, GroupRepository, IdeaRepository, TagRepository, UserRepository,
};
use ideaboard_db::{Database, ObjectStore};

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;

/// Repository and object store handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub tags: Arc<dyn TagRepository>,
    pub ideas: Arc<dyn IdeaRepository>,
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub feedbacks: Arc<dyn FeedbackRepository>,
    pub files: Arc<dyn ObjectStore>,
    /// Pool pinged by `/health`; absent when the repositories are not Postgres.
    pub pool: Option<sqlx::PgPool>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// State backed by the Postgres repositories of `db`.
    pub fn from_database(db: Database, files: Arc<dyn ObjectStore>) -> Self {
        Self {
            tags: Arc::new(db.tags),
            ideas: Arc::new(db.ideas),
            users: Arc::new(db.users),
            groups: Arc::new(db.groups),
            feedbacks: Arc::new(db.feedbacks),
            files,
            pool: Some(db.pool),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}
