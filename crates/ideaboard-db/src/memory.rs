//! In-memory repositories and object store.
//!
//! Enabled by the `memory` feature. Every handle created from one
//! [`MemoryDatabase`] shares the same state, and the state enforces the same
//! rules the schema does: unique tag names, unique links, foreign keys, and
//! cascading deletes.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use ideaboard_core::{
    dedup_tag_names, validate_tag_name, validate_tag_names, Access, AccessFilter,
    CreateFeedbackRequest, CreateGroupRequest, CreateIdeaRequest, CreateUserRequest, Error,
    Feedback, FeedbackRepository, Group, GroupRepository, GroupWithTags, Idea, IdeaRepository,
    IdeaWithTags, ListGroupsQuery, ListIdeasQuery, ListTagsQuery, ListUsersQuery, Result, SortKey,
    SortOrder, Tag, TagRepository, TagTarget, UpdateFeedbackRequest, UpdateGroupRequest,
    UpdateIdeaRequest, UpdateUserRequest, User, UserRepository, UserWithTags, VoteChange,
    VoteDirection,
};

use crate::object_store::{ObjectStore, StoredObject};

#[derive(Default)]
struct State {
    seq: HashMap<&'static str, i64>,
    users: BTreeMap<String, User>,
    tags: BTreeMap<i64, Tag>,
    ideas: BTreeMap<i64, Idea>,
    groups: BTreeMap<i64, Group>,
    feedbacks: BTreeMap<i64, Feedback>,
    idea_tags: BTreeSet<(i64, i64)>,
    user_tags: BTreeSet<(String, i64)>,
    group_tags: BTreeSet<(i64, i64)>,
    idea_feedbacks: BTreeSet<(i64, i64)>,
}

fn fk_violation(what: &str) -> Error {
    Error::ConstraintViolation(format!("{} does not exist", what))
}

fn apply_counter(counter: &mut i32, change: VoteChange) {
    *counter += change.delta();
}

fn vote_counter<'a>(
    upvotes: &'a mut i32,
    downvotes: &'a mut i32,
    direction: VoteDirection,
) -> &'a mut i32 {
    match direction {
        VoteDirection::Up => upvotes,
        VoteDirection::Down => downvotes,
    }
}

/// Sort rows the way the SQL listing orders them: the key's column in the
/// requested direction, ties and the unsorted case by id ascending.
fn apply_order<T, K: SortKey>(
    rows: &mut [T],
    sort: Option<K>,
    order: Option<SortOrder>,
    by_column: impl Fn(&T, &T, &str) -> Ordering,
    by_id: impl Fn(&T, &T) -> Ordering,
) {
    match sort {
        None => rows.sort_by(|a, b| by_id(a, b)),
        Some(key) => {
            let column = key.column();
            let direction = order.unwrap_or_else(|| key.default_order());
            rows.sort_by(|a, b| {
                let primary = by_column(a, b, column);
                let primary = match direction {
                    SortOrder::Asc => primary,
                    SortOrder::Desc => primary.reverse(),
                };
                primary.then_with(|| by_id(a, b))
            });
        }
    }
}

impl State {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let id = self.seq.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    fn tag_id(&self, name: &str) -> Option<i64> {
        self.tags.values().find(|t| t.name == name).map(|t| t.id)
    }

    fn normalize(&mut self, names: &[String]) -> Vec<Tag> {
        dedup_tag_names(names)
            .into_iter()
            .map(|name| match self.tag_id(&name) {
                Some(id) => self.tags[&id].clone(),
                None => {
                    let id = self.next_id("tags");
                    let tag = Tag {
                        id,
                        name,
                        upvotes: 0,
                        downvotes: 0,
                    };
                    self.tags.insert(id, tag.clone());
                    tag
                }
            })
            .collect()
    }

    fn target_exists(&self, target: &TagTarget) -> bool {
        match target {
            TagTarget::Idea(id) => self.ideas.contains_key(id),
            TagTarget::User(id) => self.users.contains_key(id),
            TagTarget::Group(id) => self.groups.contains_key(id),
        }
    }

    fn link(&mut self, target: &TagTarget, names: &[String]) -> Result<Vec<i64>> {
        let ids: Vec<i64> = self.normalize(names).iter().map(|t| t.id).collect();
        if ids.is_empty() {
            return Ok(ids);
        }
        if !self.target_exists(target) {
            return Err(fk_violation(&format!("{:?}", target)));
        }
        for tag_id in &ids {
            match target {
                TagTarget::Idea(id) => {
                    self.idea_tags.insert((*id, *tag_id));
                }
                TagTarget::User(id) => {
                    self.user_tags.insert((id.clone(), *tag_id));
                }
                TagTarget::Group(id) => {
                    self.group_tags.insert((*id, *tag_id));
                }
            }
        }
        Ok(ids)
    }

    fn unlink(&mut self, target: &TagTarget, name: &str) {
        let Some(tag_id) = self.tag_id(name) else {
            return;
        };
        match target {
            TagTarget::Idea(id) => {
                self.idea_tags.remove(&(*id, tag_id));
            }
            TagTarget::User(id) => {
                self.user_tags.remove(&(id.clone(), tag_id));
            }
            TagTarget::Group(id) => {
                self.group_tags.remove(&(*id, tag_id));
            }
        }
    }

    fn linked_tag_ids(&self, target: &TagTarget) -> Vec<i64> {
        match target {
            TagTarget::Idea(id) => self
                .idea_tags
                .iter()
                .filter(|(e, _)| e == id)
                .map(|(_, t)| *t)
                .collect(),
            TagTarget::User(id) => self
                .user_tags
                .iter()
                .filter(|(e, _)| e == id)
                .map(|(_, t)| *t)
                .collect(),
            TagTarget::Group(id) => self
                .group_tags
                .iter()
                .filter(|(e, _)| e == id)
                .map(|(_, t)| *t)
                .collect(),
        }
    }

    /// Tag names of a target, ordered by name.
    fn tag_names(&self, target: &TagTarget) -> Vec<String> {
        let mut names: Vec<String> = self
            .linked_tag_ids(target)
            .iter()
            .filter_map(|id| self.tags.get(id))
            .map(|t| t.name.clone())
            .collect();
        names.sort();
        names
    }

    fn has_tag(&self, target: &TagTarget, name: &Option<String>) -> bool {
        match name {
            None => true,
            Some(name) => self
                .linked_tag_ids(target)
                .iter()
                .filter_map(|id| self.tags.get(id))
                .any(|t| &t.name == name),
        }
    }

    fn idea_with_tags(&self, idea: &Idea) -> IdeaWithTags {
        IdeaWithTags {
            tags: self.tag_names(&TagTarget::Idea(idea.id)),
            idea: idea.clone(),
        }
    }

    fn user_with_tags(&self, user: &User) -> UserWithTags {
        UserWithTags {
            tags: self.tag_names(&TagTarget::User(user.id.clone())),
            user: user.clone(),
        }
    }

    fn group_with_tags(&self, group: &Group) -> GroupWithTags {
        GroupWithTags {
            tags: self.tag_names(&TagTarget::Group(group.id)),
            group: group.clone(),
        }
    }

    fn delete_feedback(&mut self, id: i64) -> bool {
        self.idea_feedbacks.retain(|(_, f)| *f != id);
        self.feedbacks.remove(&id).is_some()
    }

    fn delete_idea(&mut self, id: i64) -> bool {
        let feedback_ids: Vec<i64> = self
            .feedbacks
            .values()
            .filter(|f| f.idea_id == id)
            .map(|f| f.id)
            .collect();
        for feedback_id in feedback_ids {
            self.delete_feedback(feedback_id);
        }
        self.idea_tags.retain(|(i, _)| *i != id);
        self.idea_feedbacks.retain(|(i, _)| *i != id);
        self.ideas.remove(&id).is_some()
    }

    fn delete_user(&mut self, id: &str) -> bool {
        let idea_ids: Vec<i64> = self
            .ideas
            .values()
            .filter(|i| i.user_id == id)
            .map(|i| i.id)
            .collect();
        for idea_id in idea_ids {
            self.delete_idea(idea_id);
        }
        let feedback_ids: Vec<i64> = self
            .feedbacks
            .values()
            .filter(|f| f.user_id == id)
            .map(|f| f.id)
            .collect();
        for feedback_id in feedback_ids {
            self.delete_feedback(feedback_id);
        }
        self.user_tags.retain(|(u, _)| u != id);
        self.users.remove(id).is_some()
    }

    fn delete_tag(&mut self, id: i64) {
        self.idea_tags.retain(|(_, t)| *t != id);
        self.user_tags.retain(|(_, t)| *t != id);
        self.group_tags.retain(|(_, t)| *t != id);
        self.tags.remove(&id);
    }
}

type Shared = Arc<Mutex<State>>;

/// A set of in-memory repositories sharing one state.
#[derive(Clone)]
pub struct MemoryDatabase {
    pub tags: MemoryTagRepository,
    pub ideas: MemoryIdeaRepository,
    pub users: MemoryUserRepository,
    pub groups: MemoryGroupRepository,
    pub feedbacks: MemoryFeedbackRepository,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        let state: Shared = Arc::default();
        Self {
            tags: MemoryTagRepository(state.clone()),
            ideas: MemoryIdeaRepository(state.clone()),
            users: MemoryUserRepository(state.clone()),
            groups: MemoryGroupRepository(state.clone()),
            feedbacks: MemoryFeedbackRepository(state),
        }
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct MemoryTagRepository(Shared);

#[derive(Clone)]
pub struct MemoryIdeaRepository(Shared);

#[derive(Clone)]
pub struct MemoryUserRepository(Shared);

#[derive(Clone)]
pub struct MemoryGroupRepository(Shared);

#[derive(Clone)]
pub struct MemoryFeedbackRepository(Shared);

#[async_trait]
impl TagRepository for MemoryTagRepository {
    async fn list(&self, query: ListTagsQuery) -> Result<Vec<Tag>> {
        let state = self.0.lock().await;
        let mut tags: Vec<Tag> = state.tags.values().cloned().collect();
        apply_order(
            &mut tags,
            query.sort,
            query.order,
            |a, b, column| match column {
                "name" => a.name.cmp(&b.name),
                "upvotes" => a.upvotes.cmp(&b.upvotes),
                _ => a.downvotes.cmp(&b.downvotes),
            },
            |a, b| a.id.cmp(&b.id),
        );
        Ok(tags)
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let state = self.0.lock().await;
        Ok(state.tag_id(name).map(|id| state.tags[&id].clone()))
    }

    async fn delete_by_name(&self, name: &str) -> Result<()> {
        let mut state = self.0.lock().await;
        let id = state
            .tag_id(name)
            .ok_or_else(|| Error::NotFound(format!("Tag '{}' not found", name)))?;
        state.delete_tag(id);
        Ok(())
    }

    async fn vote(&self, id: i64, direction: VoteDirection, change: VoteChange) -> Result<Tag> {
        let mut state = self.0.lock().await;
        let tag = state
            .tags
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Tag {} not found", id)))?;
        apply_counter(
            vote_counter(&mut tag.upvotes, &mut tag.downvotes, direction),
            change,
        );
        Ok(tag.clone())
    }

    async fn normalize(&self, names: &[String]) -> Result<Vec<Tag>> {
        validate_tag_names(names)?;
        Ok(self.0.lock().await.normalize(names))
    }

    async fn link(&self, target: &TagTarget, names: &[String]) -> Result<Vec<i64>> {
        validate_tag_names(names)?;
        self.0.lock().await.link(target, names)
    }

    async fn unlink(&self, target: &TagTarget, name: &str) -> Result<()> {
        validate_tag_name(name)?;
        self.0.lock().await.unlink(target, name);
        Ok(())
    }
}

#[async_trait]
impl IdeaRepository for MemoryIdeaRepository {
    async fn create(&self, req: CreateIdeaRequest) -> Result<IdeaWithTags> {
        req.validate()?;
        let mut state = self.0.lock().await;
        if !state.users.contains_key(&req.user_id) {
            return Err(fk_violation(&format!("user '{}'", req.user_id)));
        }
        let id = state.next_id("ideas");
        let idea = Idea {
            id,
            title: req.title,
            content: req.content,
            user_id: req.user_id,
            files_url: req.files_url,
            access: req.access,
            upvotes: 0,
            downvotes: 0,
            created_at: Utc::now(),
        };
        state.ideas.insert(id, idea.clone());
        state.link(&TagTarget::Idea(id), &req.tags)?;
        Ok(state.idea_with_tags(&idea))
    }

    async fn get(&self, id: i64) -> Result<Option<IdeaWithTags>> {
        let state = self.0.lock().await;
        Ok(state.ideas.get(&id).map(|i| state.idea_with_tags(i)))
    }

    async fn list(&self, query: ListIdeasQuery) -> Result<Vec<IdeaWithTags>> {
        let access = query.access_filter();
        let state = self.0.lock().await;
        let mut ideas: Vec<IdeaWithTags> = state
            .ideas
            .values()
            .filter(|i| query.user_id.as_ref().map_or(true, |u| &i.user_id == u))
            .filter(|i| match &access {
                AccessFilter::Unfiltered => true,
                AccessFilter::VisibleTo(scope) => &i.access == scope || i.access == Access::Public,
            })
            .filter(|i| state.has_tag(&TagTarget::Idea(i.id), &query.tag))
            .map(|i| state.idea_with_tags(i))
            .collect();
        apply_order(
            &mut ideas,
            query.sort,
            query.order,
            |a, b, column| match column {
                "created_at" => a.idea.created_at.cmp(&b.idea.created_at),
                "upvotes" => a.idea.upvotes.cmp(&b.idea.upvotes),
                "downvotes" => a.idea.downvotes.cmp(&b.idea.downvotes),
                _ => a.idea.title.cmp(&b.idea.title),
            },
            |a, b| a.idea.id.cmp(&b.idea.id),
        );
        Ok(ideas)
    }

    async fn update(&self, id: i64, req: UpdateIdeaRequest) -> Result<IdeaWithTags> {
        req.validate()?;
        let mut state = self.0.lock().await;
        let idea = state
            .ideas
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Idea {} not found", id)))?;
        if let Some(title) = req.title {
            idea.title = title;
        }
        if let Some(content) = req.content {
            idea.content = content;
        }
        if let Some(access) = req.access {
            idea.access = access;
        }
        let idea = idea.clone();
        if let Some(tags) = &req.tags {
            state.link(&TagTarget::Idea(id), tags)?;
        }
        Ok(state.idea_with_tags(&idea))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        if self.0.lock().await.delete_idea(id) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("Idea {} not found", id)))
        }
    }

    async fn exists(&self, id: i64) -> Result<bool> {
        Ok(self.0.lock().await.ideas.contains_key(&id))
    }

    async fn vote(&self, id: i64, direction: VoteDirection, change: VoteChange) -> Result<Idea> {
        let mut state = self.0.lock().await;
        let idea = state
            .ideas
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Idea {} not found", id)))?;
        apply_counter(
            vote_counter(&mut idea.upvotes, &mut idea.downvotes, direction),
            change,
        );
        Ok(idea.clone())
    }

    async fn append_file(&self, id: i64, url: &str) -> Result<Idea> {
        let mut state = self.0.lock().await;
        let idea = state
            .ideas
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Idea {} not found", id)))?;
        idea.files_url.push(url.to_string());
        Ok(idea.clone())
    }

    async fn remove_file(&self, id: i64, url: &str) -> Result<Idea> {
        let mut state = self.0.lock().await;
        let idea = state
            .ideas
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Idea {} not found", id)))?;
        idea.files_url.retain(|u| u != url);
        Ok(idea.clone())
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, req: CreateUserRequest) -> Result<UserWithTags> {
        req.validate()?;
        let mut state = self.0.lock().await;
        if state.users.contains_key(&req.id) {
            return Err(Error::ConstraintViolation(format!(
                "user '{}' already exists (users_pkey)",
                req.id
            )));
        }
        let user = User {
            id: req.id,
            name: req.name,
            email: req.email,
            role: req.role,
            image_url: req.image_url,
        };
        state.users.insert(user.id.clone(), user.clone());
        state.link(&TagTarget::User(user.id.clone()), &req.tags)?;
        Ok(state.user_with_tags(&user))
    }

    async fn get(&self, id: &str) -> Result<Option<UserWithTags>> {
        let state = self.0.lock().await;
        Ok(state.users.get(id).map(|u| state.user_with_tags(u)))
    }

    async fn list(&self, query: ListUsersQuery) -> Result<Vec<UserWithTags>> {
        let state = self.0.lock().await;
        let mut users: Vec<UserWithTags> = state
            .users
            .values()
            .filter(|u| state.has_tag(&TagTarget::User(u.id.clone()), &query.tag))
            .map(|u| state.user_with_tags(u))
            .collect();
        apply_order(
            &mut users,
            query.sort,
            query.order,
            |a, b, column| match column {
                "name" => a.user.name.cmp(&b.user.name),
                "email" => a.user.email.cmp(&b.user.email),
                _ => a.user.role.cmp(&b.user.role),
            },
            |a, b| a.user.id.cmp(&b.user.id),
        );
        Ok(users)
    }

    async fn update(&self, id: &str, req: UpdateUserRequest) -> Result<UserWithTags> {
        req.validate()?;
        let mut state = self.0.lock().await;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("User '{}' not found", id)))?;
        if let Some(name) = req.name {
            user.name = name;
        }
        if let Some(email) = req.email {
            user.email = email;
        }
        if let Some(role) = req.role {
            user.role = role;
        }
        if let Some(image_url) = req.image_url {
            user.image_url = Some(image_url);
        }
        let user = user.clone();
        if let Some(tags) = &req.tags {
            state.link(&TagTarget::User(id.to_string()), tags)?;
        }
        Ok(state.user_with_tags(&user))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if self.0.lock().await.delete_user(id) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("User '{}' not found", id)))
        }
    }
}

#[async_trait]
impl GroupRepository for MemoryGroupRepository {
    async fn create(&self, req: CreateGroupRequest) -> Result<GroupWithTags> {
        req.validate()?;
        let mut state = self.0.lock().await;
        let id = state.next_id("groups");
        let group = Group {
            id,
            title: req.title,
            description: req.description,
            user_ids: req.user_ids,
            likes: 0,
        };
        state.groups.insert(id, group.clone());
        state.link(&TagTarget::Group(id), &req.tags)?;
        Ok(state.group_with_tags(&group))
    }

    async fn get(&self, id: i64) -> Result<Option<GroupWithTags>> {
        let state = self.0.lock().await;
        Ok(state.groups.get(&id).map(|g| state.group_with_tags(g)))
    }

    async fn list(&self, query: ListGroupsQuery) -> Result<Vec<GroupWithTags>> {
        let state = self.0.lock().await;
        let mut groups: Vec<GroupWithTags> = state
            .groups
            .values()
            .filter(|g| state.has_tag(&TagTarget::Group(g.id), &query.tag))
            .map(|g| state.group_with_tags(g))
            .collect();
        apply_order(
            &mut groups,
            query.sort,
            query.order,
            |a, b, column| match column {
                "title" => a.group.title.cmp(&b.group.title),
                _ => a.group.likes.cmp(&b.group.likes),
            },
            |a, b| a.group.id.cmp(&b.group.id),
        );
        Ok(groups)
    }

    async fn update(&self, id: i64, req: UpdateGroupRequest) -> Result<GroupWithTags> {
        req.validate()?;
        let mut state = self.0.lock().await;
        let group = state
            .groups
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Group {} not found", id)))?;
        if let Some(title) = req.title {
            group.title = title;
        }
        if let Some(description) = req.description {
            group.description = description;
        }
        if let Some(user_ids) = req.user_ids {
            group.user_ids = user_ids;
        }
        let group = group.clone();
        if let Some(tags) = &req.tags {
            state.link(&TagTarget::Group(id), tags)?;
        }
        Ok(state.group_with_tags(&group))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut state = self.0.lock().await;
        if state.groups.remove(&id).is_none() {
            return Err(Error::NotFound(format!("Group {} not found", id)));
        }
        state.group_tags.retain(|(g, _)| *g != id);
        Ok(())
    }

    async fn add_member(&self, id: i64, user_id: &str) -> Result<Group> {
        let mut state = self.0.lock().await;
        let group = state
            .groups
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Group {} not found", id)))?;
        group.user_ids.push(user_id.to_string());
        Ok(group.clone())
    }

    async fn remove_member(&self, id: i64, user_id: &str) -> Result<Group> {
        let mut state = self.0.lock().await;
        let group = state
            .groups
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Group {} not found", id)))?;
        group.user_ids.retain(|u| u != user_id);
        Ok(group.clone())
    }

    async fn like(&self, id: i64, change: VoteChange) -> Result<Group> {
        let mut state = self.0.lock().await;
        let group = state
            .groups
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Group {} not found", id)))?;
        apply_counter(&mut group.likes, change);
        Ok(group.clone())
    }
}

#[async_trait]
impl FeedbackRepository for MemoryFeedbackRepository {
    async fn create(&self, req: CreateFeedbackRequest) -> Result<Feedback> {
        req.validate()?;
        let mut state = self.0.lock().await;
        if !state.ideas.contains_key(&req.idea_id) {
            return Err(fk_violation(&format!("idea {}", req.idea_id)));
        }
        if !state.users.contains_key(&req.user_id) {
            return Err(fk_violation(&format!("user '{}'", req.user_id)));
        }
        let id = state.next_id("feedbacks");
        let feedback = Feedback {
            id,
            idea_id: req.idea_id,
            user_id: req.user_id,
            content: req.content,
            files_url: req.files_url,
            feedback_links: req.feedback_links,
            user_tag: req.user_tag,
            upvotes: 0,
            downvotes: 0,
            created_at: Utc::now(),
        };
        state.feedbacks.insert(id, feedback.clone());
        state.idea_feedbacks.insert((feedback.idea_id, id));
        Ok(feedback)
    }

    async fn get(&self, id: i64) -> Result<Option<Feedback>> {
        Ok(self.0.lock().await.feedbacks.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Feedback>> {
        Ok(self.0.lock().await.feedbacks.values().cloned().collect())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Feedback>> {
        let state = self.0.lock().await;
        Ok(state
            .feedbacks
            .values()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_for_idea(&self, idea_id: i64) -> Result<Vec<Feedback>> {
        let state = self.0.lock().await;
        Ok(state
            .idea_feedbacks
            .iter()
            .filter(|(i, _)| *i == idea_id)
            .filter_map(|(_, f)| state.feedbacks.get(f))
            .cloned()
            .collect())
    }

    async fn update(&self, id: i64, req: UpdateFeedbackRequest) -> Result<Feedback> {
        req.validate()?;
        let mut state = self.0.lock().await;
        let feedback = state
            .feedbacks
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Feedback {} not found", id)))?;
        if let Some(content) = req.content {
            feedback.content = content;
        }
        if let Some(files_url) = req.files_url {
            feedback.files_url = files_url;
        }
        if let Some(links) = req.feedback_links {
            feedback.feedback_links = links;
        }
        if let Some(user_tag) = req.user_tag {
            feedback.user_tag = Some(user_tag);
        }
        Ok(feedback.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        if self.0.lock().await.delete_feedback(id) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("Feedback {} not found", id)))
        }
    }

    async fn vote(
        &self,
        id: i64,
        direction: VoteDirection,
        change: VoteChange,
    ) -> Result<Feedback> {
        let mut state = self.0.lock().await;
        let feedback = state
            .feedbacks
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Feedback {} not found", id)))?;
        apply_counter(
            vote_counter(&mut feedback.upvotes, &mut feedback.downvotes, direction),
            change,
        );
        Ok(feedback.clone())
    }
}

/// Object store keeping blobs in a map. URLs use the configured base.
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    public_base_url: String,
}

impl MemoryObjectStore {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            public_base_url: public_base_url.into(),
        }
    }

    /// Keys currently held, in order.
    pub async fn keys(&self) -> Vec<String> {
        self.objects.lock().await.keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        self.objects.lock().await.insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: Some(content_type.to_string()),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        Ok(self.objects.lock().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.lock().await.remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> CreateUserRequest {
        CreateUserRequest {
            id: id.to_string(),
            name: format!("{} name", id),
            email: format!("{}@example.com", id),
            role: "member".to_string(),
            image_url: None,
            tags: vec![],
        }
    }

    fn idea(user_id: &str, access: Access, tags: &[&str]) -> CreateIdeaRequest {
        CreateIdeaRequest {
            title: "Title".to_string(),
            content: "Content".to_string(),
            user_id: user_id.to_string(),
            files_url: vec![],
            access,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_link_twice_is_idempotent() {
        let db = MemoryDatabase::new();
        db.users.create(user("alice")).await.unwrap();
        let created = db.ideas.create(idea("alice", Access::Public, &[])).await.unwrap();
        let target = TagTarget::Idea(created.idea.id);
        let names = vec!["a".to_string(), "b".to_string()];

        let first = db.tags.link(&target, &names).await.unwrap();
        let second = db.tags.link(&target, &names).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(db.tags.list(ListTagsQuery::default()).await.unwrap().len(), 2);
        let fetched = db.ideas.get(created.idea.id).await.unwrap().unwrap();
        assert_eq!(fetched.tags, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_link_to_missing_target_keeps_tags() {
        let db = MemoryDatabase::new();
        let err = db
            .tags
            .link(&TagTarget::Idea(99), &["orphan".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(_)));
        assert!(db.tags.get_by_name("orphan").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_user_delete_cascades() {
        let db = MemoryDatabase::new();
        db.users.create(user("bob")).await.unwrap();
        let created = db.ideas.create(idea("bob", Access::Public, &["x"])).await.unwrap();
        db.feedbacks
            .create(CreateFeedbackRequest {
                idea_id: created.idea.id,
                user_id: "bob".to_string(),
                content: "nice".to_string(),
                files_url: vec![],
                feedback_links: vec![],
                user_tag: None,
            })
            .await
            .unwrap();

        db.users.delete("bob").await.unwrap();

        assert!(db.ideas.get(created.idea.id).await.unwrap().is_none());
        assert!(db.feedbacks.list().await.unwrap().is_empty());
        // Tags are shared vocabulary and survive.
        assert!(db.tags.get_by_name("x").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_access_filter_and_ordering() {
        let db = MemoryDatabase::new();
        db.users.create(user("carol")).await.unwrap();
        for access in [
            Access::Public,
            Access::Private("42".into()),
            Access::Private("99".into()),
        ] {
            db.ideas.create(idea("carol", access, &[])).await.unwrap();
        }

        let visible = db
            .ideas
            .list(ListIdeasQuery {
                access: Some("private:42".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let accesses: Vec<String> = visible.iter().map(|i| i.idea.access.to_string()).collect();
        assert_eq!(accesses, vec!["public", "private:42"]);
    }

    #[tokio::test]
    async fn test_memory_object_store_urls() {
        let store = MemoryObjectStore::new("http://files.test/");
        store.put("1/a.txt", b"a", "text/plain").await.unwrap();
        assert_eq!(store.public_url("1/a.txt"), "http://files.test/1/a.txt");
        assert_eq!(store.keys().await, vec!["1/a.txt"]);
        store.delete("1/a.txt").await.unwrap();
        store.delete("1/a.txt").await.unwrap();
        assert!(store.get("1/a.txt").await.unwrap().is_none());
    }
}
