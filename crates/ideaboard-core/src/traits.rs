//! Core traits for ideaboard abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::*;

/// Maximum accepted length of a tag name, in characters.
pub const MAX_TAG_NAME_LEN: usize = 100;

/// Validate a tag name.
///
/// Names are free text and case-sensitive; they only need to be non-blank and
/// at most [`MAX_TAG_NAME_LEN`] characters.
pub fn validate_tag_name(tag: &str) -> Result<()> {
    if tag.trim().is_empty() {
        return Err(Error::InvalidInput("Tag name cannot be empty".to_string()));
    }
    if tag.chars().count() > MAX_TAG_NAME_LEN {
        return Err(Error::InvalidInput(format!(
            "Tag name must be {} characters or less",
            MAX_TAG_NAME_LEN
        )));
    }
    Ok(())
}

pub fn validate_tag_names(tags: &[String]) -> Result<()> {
    tags.iter().try_for_each(|t| validate_tag_name(t))
}

/// Deduplicate tag names, keeping the first occurrence of each.
pub fn dedup_tag_names(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect()
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn require_opt(field: &str, value: Option<&String>) -> Result<()> {
    value.map_or(Ok(()), |v| require(field, v))
}

// =============================================================================
// SORTING
// =============================================================================

/// Sort direction for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// A column a list may be ordered by.
///
/// Implementors are closed enums; the column name is interpolated into SQL so
/// it must never come from caller text.
pub trait SortKey: Copy {
    fn column(self) -> &'static str;

    fn default_order(self) -> SortOrder {
        SortOrder::Desc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaSort {
    CreatedAt,
    Upvotes,
    Downvotes,
    Title,
}

impl SortKey for IdeaSort {
    fn column(self) -> &'static str {
        match self {
            IdeaSort::CreatedAt => "created_at",
            IdeaSort::Upvotes => "upvotes",
            IdeaSort::Downvotes => "downvotes",
            IdeaSort::Title => "title",
        }
    }

    fn default_order(self) -> SortOrder {
        match self {
            IdeaSort::Title => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserSort {
    Name,
    Email,
    Role,
}

impl SortKey for UserSort {
    fn column(self) -> &'static str {
        match self {
            UserSort::Name => "name",
            UserSort::Email => "email",
            UserSort::Role => "role",
        }
    }

    fn default_order(self) -> SortOrder {
        SortOrder::Asc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupSort {
    Title,
    Likes,
}

impl SortKey for GroupSort {
    fn column(self) -> &'static str {
        match self {
            GroupSort::Title => "title",
            GroupSort::Likes => "likes",
        }
    }

    fn default_order(self) -> SortOrder {
        match self {
            GroupSort::Title => SortOrder::Asc,
            GroupSort::Likes => SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagSort {
    Name,
    Upvotes,
    Downvotes,
}

impl SortKey for TagSort {
    fn column(self) -> &'static str {
        match self {
            TagSort::Name => "name",
            TagSort::Upvotes => "upvotes",
            TagSort::Downvotes => "downvotes",
        }
    }

    fn default_order(self) -> SortOrder {
        match self {
            TagSort::Name => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }
}

// =============================================================================
// LIST QUERIES
// =============================================================================

/// Query parameters for listing ideas.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListIdeasQuery {
    /// Only ideas linked to this tag name
    pub tag: Option<String>,
    pub sort: Option<IdeaSort>,
    pub order: Option<SortOrder>,
    /// `private:<id>` or `group:<id>` restricts to that scope plus `public`
    pub access: Option<String>,
    /// Only ideas owned by this user
    pub user_id: Option<String>,
}

impl ListIdeasQuery {
    pub fn access_filter(&self) -> AccessFilter {
        AccessFilter::from_param(self.access.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListUsersQuery {
    pub tag: Option<String>,
    pub sort: Option<UserSort>,
    pub order: Option<SortOrder>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListGroupsQuery {
    pub tag: Option<String>,
    pub sort: Option<GroupSort>,
    pub order: Option<SortOrder>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListTagsQuery {
    pub sort: Option<TagSort>,
    pub order: Option<SortOrder>,
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Request for creating a new idea.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateIdeaRequest {
    pub title: String,
    pub content: String,
    pub user_id: String,
    #[serde(default)]
    pub files_url: Vec<String>,
    pub access: Access,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateIdeaRequest {
    pub fn validate(&self) -> Result<()> {
        require("title", &self.title)?;
        require("content", &self.content)?;
        require("user_id", &self.user_id)?;
        validate_tag_names(&self.tags)
    }
}

/// Request for updating an idea. Absent fields are left unchanged; `tags`
/// are linked in addition to the existing ones.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateIdeaRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub access: Option<Access>,
    pub tags: Option<Vec<String>>,
}

impl UpdateIdeaRequest {
    pub fn validate(&self) -> Result<()> {
        require_opt("title", self.title.as_ref())?;
        require_opt("content", self.content.as_ref())?;
        self.tags.as_deref().map_or(Ok(()), validate_tag_names)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<()> {
        require("id", &self.id)?;
        require("name", &self.name)?;
        require("email", &self.email)?;
        require("role", &self.role)?;
        validate_tag_names(&self.tags)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub image_url: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<()> {
        require_opt("name", self.name.as_ref())?;
        require_opt("email", self.email.as_ref())?;
        require_opt("role", self.role.as_ref())?;
        self.tags.as_deref().map_or(Ok(()), validate_tag_names)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateGroupRequest {
    pub fn validate(&self) -> Result<()> {
        require("title", &self.title)?;
        validate_tag_names(&self.tags)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateGroupRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub user_ids: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

impl UpdateGroupRequest {
    pub fn validate(&self) -> Result<()> {
        require_opt("title", self.title.as_ref())?;
        self.tags.as_deref().map_or(Ok(()), validate_tag_names)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateFeedbackRequest {
    pub idea_id: i64,
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    pub files_url: Vec<String>,
    #[serde(default)]
    pub feedback_links: Vec<i64>,
    pub user_tag: Option<String>,
}

impl CreateFeedbackRequest {
    pub fn validate(&self) -> Result<()> {
        require("user_id", &self.user_id)?;
        require("content", &self.content)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateFeedbackRequest {
    pub content: Option<String>,
    pub files_url: Option<Vec<String>>,
    pub feedback_links: Option<Vec<i64>>,
    pub user_tag: Option<String>,
}

impl UpdateFeedbackRequest {
    pub fn validate(&self) -> Result<()> {
        require_opt("content", self.content.as_ref())
    }
}

// =============================================================================
// REPOSITORY TRAITS
// =============================================================================

/// An entity that tags can be linked to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagTarget {
    Idea(i64),
    User(String),
    Group(i64),
}

/// Repository for tags and the tag normalizer.
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// List all tags.
    async fn list(&self, query: ListTagsQuery) -> Result<Vec<Tag>>;

    /// Look a tag up by its exact name.
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// Delete a tag by name, cascading its links.
    async fn delete_by_name(&self, name: &str) -> Result<()>;

    /// Adjust a tag's vote counter by one.
    async fn vote(&self, id: i64, direction: VoteDirection, change: VoteChange) -> Result<Tag>;

    /// Ensure every name exists and return the tags in first-occurrence order.
    async fn normalize(&self, names: &[String]) -> Result<Vec<Tag>>;

    /// Normalize the names and link them to the target. Returns tag ids.
    async fn link(&self, target: &TagTarget, names: &[String]) -> Result<Vec<i64>>;

    /// Remove the link between the target and the named tag, if any.
    async fn unlink(&self, target: &TagTarget, name: &str) -> Result<()>;
}

/// Repository for idea CRUD, votes, and file links.
#[async_trait]
pub trait IdeaRepository: Send + Sync {
    async fn create(&self, req: CreateIdeaRequest) -> Result<IdeaWithTags>;

    async fn get(&self, id: i64) -> Result<Option<IdeaWithTags>>;

    async fn list(&self, query: ListIdeasQuery) -> Result<Vec<IdeaWithTags>>;

    async fn update(&self, id: i64, req: UpdateIdeaRequest) -> Result<IdeaWithTags>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn exists(&self, id: i64) -> Result<bool>;

    async fn vote(&self, id: i64, direction: VoteDirection, change: VoteChange) -> Result<Idea>;

    /// Append a URL to the idea's file list.
    async fn append_file(&self, id: i64, url: &str) -> Result<Idea>;

    /// Remove every occurrence of a URL from the idea's file list.
    async fn remove_file(&self, id: i64, url: &str) -> Result<Idea>;
}

/// Repository for user CRUD.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, req: CreateUserRequest) -> Result<UserWithTags>;

    async fn get(&self, id: &str) -> Result<Option<UserWithTags>>;

    async fn list(&self, query: ListUsersQuery) -> Result<Vec<UserWithTags>>;

    async fn update(&self, id: &str, req: UpdateUserRequest) -> Result<UserWithTags>;

    async fn delete(&self, id: &str) -> Result<()>;
}

/// Repository for groups and their member lists.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn create(&self, req: CreateGroupRequest) -> Result<GroupWithTags>;

    async fn get(&self, id: i64) -> Result<Option<GroupWithTags>>;

    async fn list(&self, query: ListGroupsQuery) -> Result<Vec<GroupWithTags>>;

    async fn update(&self, id: i64, req: UpdateGroupRequest) -> Result<GroupWithTags>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn add_member(&self, id: i64, user_id: &str) -> Result<Group>;

    async fn remove_member(&self, id: i64, user_id: &str) -> Result<Group>;

    async fn like(&self, id: i64, change: VoteChange) -> Result<Group>;
}

/// Repository for feedback on ideas.
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn create(&self, req: CreateFeedbackRequest) -> Result<Feedback>;

    async fn get(&self, id: i64) -> Result<Option<Feedback>>;

    async fn list(&self) -> Result<Vec<Feedback>>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Feedback>>;

    async fn list_for_idea(&self, idea_id: i64) -> Result<Vec<Feedback>>;

    async fn update(&self, id: i64, req: UpdateFeedbackRequest) -> Result<Feedback>;

    async fn delete(&self, id: i64) -> Result<()>;

    async fn vote(&self, id: i64, direction: VoteDirection, change: VoteChange)
        -> Result<Feedback>;
}
