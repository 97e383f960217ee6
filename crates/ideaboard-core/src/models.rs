//! Domain models for ideaboard.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

// =============================================================================
// ACCESS
// =============================================================================

/// Visibility of an idea.
///
/// Stored as text (`public`, `private:<user_id>`, `group:<group_id>`) and
/// parsed at the storage boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Access {
    Public,
    Private(String),
    Group(String),
}

impl Access {
    pub const PUBLIC: &'static str = "public";
    const PRIVATE_PREFIX: &'static str = "private:";
    const GROUP_PREFIX: &'static str = "group:";

    /// True for the scoped variants (`private:*` / `group:*`).
    pub fn is_scoped(&self) -> bool {
        !matches!(self, Access::Public)
    }
}

impl FromStr for Access {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::PUBLIC {
            return Ok(Access::Public);
        }
        if let Some(id) = s.strip_prefix(Self::PRIVATE_PREFIX) {
            if !id.is_empty() {
                return Ok(Access::Private(id.to_string()));
            }
        }
        if let Some(id) = s.strip_prefix(Self::GROUP_PREFIX) {
            if !id.is_empty() {
                return Ok(Access::Group(id.to_string()));
            }
        }
        Err(Error::InvalidInput(format!(
            "access must be 'public', 'private:<user_id>' or 'group:<group_id>', got '{}'",
            s
        )))
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Public => f.write_str(Self::PUBLIC),
            Access::Private(id) => write!(f, "{}{}", Self::PRIVATE_PREFIX, id),
            Access::Group(id) => write!(f, "{}{}", Self::GROUP_PREFIX, id),
        }
    }
}

impl Serialize for Access {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Access {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Access filter applied when listing ideas.
///
/// Only scoped values restrict the listing; `public`, malformed values and an
/// absent parameter all list every idea.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AccessFilter {
    #[default]
    Unfiltered,
    /// Rows whose access equals this value or `public`.
    VisibleTo(Access),
}

impl AccessFilter {
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(str::parse::<Access>) {
            Some(Ok(access)) if access.is_scoped() => AccessFilter::VisibleTo(access),
            _ => AccessFilter::Unfiltered,
        }
    }
}

// =============================================================================
// VOTES
// =============================================================================

/// Which counter a vote touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
}

/// Whether a vote is cast or withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteChange {
    Add,
    Remove,
}

impl VoteChange {
    pub fn delta(self) -> i32 {
        match self {
            VoteChange::Add => 1,
            VoteChange::Remove => -1,
        }
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

/// A platform user. The id is chosen by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub image_url: Option<String>,
}

/// A user with its pinned tag names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserWithTags {
    #[serde(flatten)]
    pub user: User,
    pub tags: Vec<String>,
}

/// A shared tag. Names are unique and case-sensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub upvotes: i32,
    pub downvotes: i32,
}

/// An idea posted by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: String,
    pub files_url: Vec<String>,
    pub access: Access,
    pub upvotes: i32,
    pub downvotes: i32,
    pub created_at: DateTime<Utc>,
}

/// An idea with its aggregated tag names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaWithTags {
    #[serde(flatten)]
    pub idea: Idea,
    pub tags: Vec<String>,
}

/// A group of users. Member ids are stored as a plain array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub user_ids: Vec<String>,
    pub likes: i32,
}

/// A group with its aggregated tag names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupWithTags {
    #[serde(flatten)]
    pub group: Group,
    pub tags: Vec<String>,
}

/// Feedback left on an idea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub idea_id: i64,
    pub user_id: String,
    pub content: String,
    pub files_url: Vec<String>,
    /// Ids of related feedback. Not checked against the feedbacks table.
    pub feedback_links: Vec<i64>,
    pub user_tag: Option<String>,
    pub upvotes: i32,
    pub downvotes: i32,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_parse_public() {
        assert_eq!("public".parse::<Access>().unwrap(), Access::Public);
    }

    #[test]
    fn test_access_parse_scoped() {
        assert_eq!(
            "private:42".parse::<Access>().unwrap(),
            Access::Private("42".to_string())
        );
        assert_eq!(
            "group:7".parse::<Access>().unwrap(),
            Access::Group("7".to_string())
        );
    }

    #[test]
    fn test_access_rejects_malformed() {
        for raw in ["", "Public", "private:", "group:", "friends:1", "private"] {
            assert!(raw.parse::<Access>().is_err(), "'{}' should not parse", raw);
        }
    }

    #[test]
    fn test_access_display_matches_storage_format() {
        for raw in ["public", "private:42", "group:alpha"] {
            assert_eq!(raw.parse::<Access>().unwrap().to_string(), raw);
        }
    }

    #[test]
    fn test_access_serde_as_string() {
        let json = serde_json::to_string(&Access::Private("99".into())).unwrap();
        assert_eq!(json, "\"private:99\"");

        let parsed: Access = serde_json::from_str("\"group:3\"").unwrap();
        assert_eq!(parsed, Access::Group("3".into()));

        assert!(serde_json::from_str::<Access>("\"everyone\"").is_err());
    }

    #[test]
    fn test_access_filter_only_for_scoped_values() {
        assert_eq!(
            AccessFilter::from_param(Some("private:42")),
            AccessFilter::VisibleTo(Access::Private("42".into()))
        );
        assert_eq!(
            AccessFilter::from_param(Some("group:1")),
            AccessFilter::VisibleTo(Access::Group("1".into()))
        );
        assert_eq!(AccessFilter::from_param(Some("public")), AccessFilter::Unfiltered);
        assert_eq!(AccessFilter::from_param(Some("bogus")), AccessFilter::Unfiltered);
        assert_eq!(AccessFilter::from_param(None), AccessFilter::Unfiltered);
    }

    #[test]
    fn test_vote_change_delta() {
        assert_eq!(VoteChange::Add.delta(), 1);
        assert_eq!(VoteChange::Remove.delta(), -1);
    }

    #[test]
    fn test_idea_with_tags_flattens() {
        let idea = IdeaWithTags {
            idea: Idea {
                id: 1,
                title: "T".into(),
                content: "C".into(),
                user_id: "1".into(),
                files_url: vec![],
                access: Access::Public,
                upvotes: 0,
                downvotes: 0,
                created_at: Utc::now(),
            },
            tags: vec![],
        };
        let value = serde_json::to_value(&idea).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["access"], "public");
        assert_eq!(value["tags"], serde_json::json!([]));
    }
}
