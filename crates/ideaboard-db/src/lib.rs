//! # ideaboard-db
//!
//! PostgreSQL database layer for ideaboard.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for users, tags, ideas, groups and feedbacks
//! - The tag normalizer shared by every taggable entity
//! - The entity + tags aggregation query builder
//! - Object store backends for idea attachments
//!
//! ## Example
//!
//! ```rust,ignore
//! use ideaboard_db::{Database, IdeaRepository, ListIdeasQuery};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/ideaboard").await?;
//!     db.migrate().await?;
//!
//!     let ideas = db.ideas.list(ListIdeasQuery::default()).await?;
//!     println!("{} ideas", ideas.len());
//!     Ok(())
//! }
//! ```
pub mod feedbacks;
pub mod groups;
pub mod ideas;
pub mod listing;
#[cfg(feature = "memory")]
pub mod memory;
pub mod object_store;
pub mod pool;
pub mod tags;
pub mod users;

// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use ideaboard_core::*;

pub use feedbacks::PgFeedbackRepository;
pub use groups::PgGroupRepository;
pub use ideas::PgIdeaRepository;
pub use listing::{ListQueryBuilder, QueryParam, TaggedTable};
pub use object_store::{
    object_key, sanitize_filename, FilesystemObjectStore, ObjectStore, StoredObject,
};
pub use pool::{create_pool, create_pool_with_config, ping, PoolConfig};
pub use tags::PgTagRepository;
pub use users::PgUserRepository;

/// Counter column touched by a vote.
pub(crate) fn vote_column(direction: VoteDirection) -> &'static str {
    match direction {
        VoteDirection::Up => "upvotes",
        VoteDirection::Down => "downvotes",
    }
}

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub tags: PgTagRepository,
    pub ideas: PgIdeaRepository,
    pub users: PgUserRepository,
    pub groups: PgGroupRepository,
    pub feedbacks: PgFeedbackRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            tags: PgTagRepository::new(pool.clone()),
            ideas: PgIdeaRepository::new(pool.clone()),
            users: PgUserRepository::new(pool.clone()),
            groups: PgGroupRepository::new(pool.clone()),
            feedbacks: PgFeedbackRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Round-trip a trivial query through the pool.
    pub async fn ping(&self) -> Result<()> {
        ping(&self.pool).await
    }
}
