//! Idea repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info};

use ideaboard_core::{
    Access, CreateIdeaRequest, Error, Idea, IdeaRepository, IdeaWithTags, ListIdeasQuery, Result,
    TagTarget, UpdateIdeaRequest, VoteChange, VoteDirection,
};

use crate::listing::{bind_params, ListQueryBuilder, QueryParam, IDEAS};
use crate::tags::link_on;
use crate::vote_column;

const IDEA_COLUMNS: &str =
    "id, title, content, user_id, files_url, access, upvotes, downvotes, created_at";

pub(crate) fn idea_from_row(row: &PgRow) -> Result<Idea> {
    let id: i64 = row.try_get("id")?;
    let raw_access: String = row.try_get("access")?;
    let access = raw_access.parse::<Access>().map_err(|_| {
        Error::Internal(format!(
            "idea {} has unrecognized access value '{}'",
            id, raw_access
        ))
    })?;

    Ok(Idea {
        id,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        user_id: row.try_get("user_id")?,
        files_url: row.try_get("files_url")?,
        access,
        upvotes: row.try_get("upvotes")?,
        downvotes: row.try_get("downvotes")?,
        created_at: row.try_get("created_at")?,
    })
}

fn idea_with_tags_from_row(row: &PgRow) -> Result<IdeaWithTags> {
    Ok(IdeaWithTags {
        idea: idea_from_row(row)?,
        tags: row.try_get("tags")?,
    })
}

/// PostgreSQL implementation of IdeaRepository.
#[derive(Clone)]
pub struct PgIdeaRepository {
    pool: Pool<Postgres>,
}

impl PgIdeaRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_required(&self, id: i64) -> Result<IdeaWithTags> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Idea {} not found", id)))
    }

    async fn update_returning(&self, sql: &str, id: i64, value: &str) -> Result<Idea> {
        let row = sqlx::query(sql)
            .bind(id)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::from_db)?
            .ok_or_else(|| Error::NotFound(format!("Idea {} not found", id)))?;
        idea_from_row(&row)
    }
}

#[async_trait]
impl IdeaRepository for PgIdeaRepository {
    async fn create(&self, req: CreateIdeaRequest) -> Result<IdeaWithTags> {
        req.validate()?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO ideas (title, content, user_id, files_url, access)
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&req.title)
        .bind(&req.content)
        .bind(&req.user_id)
        .bind(&req.files_url)
        .bind(req.access.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::from_db)?;

        link_on(&mut tx, &TagTarget::Idea(id), &req.tags).await?;

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "database",
            component = "ideas",
            op = "create",
            idea_id = id,
            user_id = %req.user_id,
            tag_count = req.tags.len(),
            "Idea created"
        );
        self.fetch_required(id).await
    }

    async fn get(&self, id: i64) -> Result<Option<IdeaWithTags>> {
        let (sql, params) = ListQueryBuilder::new(&IDEAS)
            .with_id(QueryParam::Int(id))
            .build();
        let row = bind_params(sqlx::query(&sql), params)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::from_db)?;
        row.as_ref().map(idea_with_tags_from_row).transpose()
    }

    async fn list(&self, query: ListIdeasQuery) -> Result<Vec<IdeaWithTags>> {
        let access = query.access_filter();
        let mut builder = ListQueryBuilder::new(&IDEAS);
        if let Some(user_id) = query.user_id {
            builder = builder.with_equals("user_id", QueryParam::String(user_id));
        }
        let (sql, params) = builder
            .with_tag(query.tag)
            .with_access(access)
            .order_by(query.sort, query.order)
            .build();

        let rows = bind_params(sqlx::query(&sql), params)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::from_db)?;

        debug!(
            subsystem = "database",
            component = "ideas",
            op = "list",
            result_count = rows.len(),
            "Ideas listed"
        );
        rows.iter().map(idea_with_tags_from_row).collect()
    }

    async fn update(&self, id: i64, req: UpdateIdeaRequest) -> Result<IdeaWithTags> {
        req.validate()?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let result = sqlx::query(
            "UPDATE ideas SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                access = COALESCE($4, access)
             WHERE id = $1",
        )
        .bind(id)
        .bind(req.title.as_deref())
        .bind(req.content.as_deref())
        .bind(req.access.as_ref().map(ToString::to_string))
        .execute(&mut *tx)
        .await
        .map_err(Error::from_db)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Idea {} not found", id)));
        }

        if let Some(tags) = &req.tags {
            link_on(&mut tx, &TagTarget::Idea(id), tags).await?;
        }

        tx.commit().await.map_err(Error::Database)?;
        self.fetch_required(id).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM ideas WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::from_db)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Idea {} not found", id)));
        }
        info!(subsystem = "database", component = "ideas", op = "delete", idea_id = id, "Idea deleted");
        Ok(())
    }

    async fn exists(&self, id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM ideas WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::from_db)?;
        Ok(exists)
    }

    async fn vote(&self, id: i64, direction: VoteDirection, change: VoteChange) -> Result<Idea> {
        let column = vote_column(direction);
        let row = sqlx::query(&format!(
            "UPDATE ideas SET {col} = {col} + $2 WHERE id = $1 RETURNING {cols}",
            col = column,
            cols = IDEA_COLUMNS
        ))
        .bind(id)
        .bind(change.delta())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::from_db)?
        .ok_or_else(|| Error::NotFound(format!("Idea {} not found", id)))?;
        idea_from_row(&row)
    }

    async fn append_file(&self, id: i64, url: &str) -> Result<Idea> {
        self.update_returning(
            &format!(
                "UPDATE ideas SET files_url = array_append(files_url, $2) WHERE id = $1 RETURNING {}",
                IDEA_COLUMNS
            ),
            id,
            url,
        )
        .await
    }

    async fn remove_file(&self, id: i64, url: &str) -> Result<Idea> {
        self.update_returning(
            &format!(
                "UPDATE ideas SET files_url = array_remove(files_url, $2) WHERE id = $1 RETURNING {}",
                IDEA_COLUMNS
            ),
            id,
            url,
        )
        .await
    }
}
