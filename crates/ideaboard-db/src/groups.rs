//! Group repository implementation.
//!
//! Member ids live in the `user_ids` array column and are not checked
//! against `users`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::info;

use ideaboard_core::{
    CreateGroupRequest, Error, Group, GroupRepository, GroupWithTags, ListGroupsQuery, Result,
    TagTarget, UpdateGroupRequest, VoteChange,
};

use crate::listing::{bind_params, ListQueryBuilder, QueryParam, GROUPS};
use crate::tags::link_on;

const GROUP_COLUMNS: &str = "id, title, description, user_ids, likes";

fn group_from_row(row: &PgRow) -> Result<Group> {
    Ok(Group {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        user_ids: row.try_get("user_ids")?,
        likes: row.try_get("likes")?,
    })
}

fn group_with_tags_from_row(row: &PgRow) -> Result<GroupWithTags> {
    Ok(GroupWithTags {
        group: group_from_row(row)?,
        tags: row.try_get("tags")?,
    })
}

/// PostgreSQL implementation of GroupRepository.
#[derive(Clone)]
pub struct PgGroupRepository {
    pool: Pool<Postgres>,
}

impl PgGroupRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_required(&self, id: i64) -> Result<GroupWithTags> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Group {} not found", id)))
    }

    async fn update_members(&self, sql: &str, id: i64, user_id: &str) -> Result<Group> {
        let row = sqlx::query(sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::from_db)?
            .ok_or_else(|| Error::NotFound(format!("Group {} not found", id)))?;
        group_from_row(&row)
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn create(&self, req: CreateGroupRequest) -> Result<GroupWithTags> {
        req.validate()?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO groups (title, description, user_ids) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.user_ids)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::from_db)?;

        link_on(&mut tx, &TagTarget::Group(id), &req.tags).await?;

        tx.commit().await.map_err(Error::Database)?;

        info!(subsystem = "database", component = "groups", op = "create", group_id = id, "Group created");
        self.fetch_required(id).await
    }

    async fn get(&self, id: i64) -> Result<Option<GroupWithTags>> {
        let (sql, params) = ListQueryBuilder::new(&GROUPS)
            .with_id(QueryParam::Int(id))
            .build();
        let row = bind_params(sqlx::query(&sql), params)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::from_db)?;
        row.as_ref().map(group_with_tags_from_row).transpose()
    }

    async fn list(&self, query: ListGroupsQuery) -> Result<Vec<GroupWithTags>> {
        let (sql, params) = ListQueryBuilder::new(&GROUPS)
            .with_tag(query.tag)
            .order_by(query.sort, query.order)
            .build();
        let rows = bind_params(sqlx::query(&sql), params)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::from_db)?;
        rows.iter().map(group_with_tags_from_row).collect()
    }

    async fn update(&self, id: i64, req: UpdateGroupRequest) -> Result<GroupWithTags> {
        req.validate()?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let result = sqlx::query(
            "UPDATE groups SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                user_ids = COALESCE($4, user_ids)
             WHERE id = $1",
        )
        .bind(id)
        .bind(req.title.as_deref())
        .bind(req.description.as_deref())
        .bind(req.user_ids.as_ref())
        .execute(&mut *tx)
        .await
        .map_err(Error::from_db)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Group {} not found", id)));
        }

        if let Some(tags) = &req.tags {
            link_on(&mut tx, &TagTarget::Group(id), tags).await?;
        }

        tx.commit().await.map_err(Error::Database)?;
        self.fetch_required(id).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::from_db)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Group {} not found", id)));
        }
        info!(subsystem = "database", component = "groups", op = "delete", group_id = id, "Group deleted");
        Ok(())
    }

    async fn add_member(&self, id: i64, user_id: &str) -> Result<Group> {
        self.update_members(
            &format!(
                "UPDATE groups SET user_ids = array_append(user_ids, $2) WHERE id = $1 RETURNING {}",
                GROUP_COLUMNS
            ),
            id,
            user_id,
        )
        .await
    }

    async fn remove_member(&self, id: i64, user_id: &str) -> Result<Group> {
        self.update_members(
            &format!(
                "UPDATE groups SET user_ids = array_remove(user_ids, $2) WHERE id = $1 RETURNING {}",
                GROUP_COLUMNS
            ),
            id,
            user_id,
        )
        .await
    }

    async fn like(&self, id: i64, change: VoteChange) -> Result<Group> {
        let row = sqlx::query(&format!(
            "UPDATE groups SET likes = likes + $2 WHERE id = $1 RETURNING {}",
            GROUP_COLUMNS
        ))
        .bind(id)
        .bind(change.delta())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::from_db)?
        .ok_or_else(|| Error::NotFound(format!("Group {} not found", id)))?;
        group_from_row(&row)
    }
}
