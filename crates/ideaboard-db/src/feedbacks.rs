//! Feedback repository implementation.
//!
//! Every feedback row is mirrored in `ideas_feedbacks`; both rows are written
//! in one transaction and removed together by the foreign-key cascade.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::info;

use ideaboard_core::{
    CreateFeedbackRequest, Error, Feedback, FeedbackRepository, Result, UpdateFeedbackRequest,
    VoteChange, VoteDirection,
};

use crate::vote_column;

const FEEDBACK_COLUMNS: &str = "id, idea_id, user_id, content, files_url, feedback_links, \
                                user_tag, upvotes, downvotes, created_at";

fn feedback_from_row(row: &PgRow) -> Result<Feedback> {
    Ok(Feedback {
        id: row.try_get("id")?,
        idea_id: row.try_get("idea_id")?,
        user_id: row.try_get("user_id")?,
        content: row.try_get("content")?,
        files_url: row.try_get("files_url")?,
        feedback_links: row.try_get("feedback_links")?,
        user_tag: row.try_get("user_tag")?,
        upvotes: row.try_get("upvotes")?,
        downvotes: row.try_get("downvotes")?,
        created_at: row.try_get("created_at")?,
    })
}

/// PostgreSQL implementation of FeedbackRepository.
#[derive(Clone)]
pub struct PgFeedbackRepository {
    pool: Pool<Postgres>,
}

impl PgFeedbackRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_many(&self, sql: &str, filter: Option<&str>) -> Result<Vec<Feedback>> {
        let mut query = sqlx::query(sql);
        if let Some(value) = filter {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(Error::from_db)?;
        rows.iter().map(feedback_from_row).collect()
    }
}

#[async_trait]
impl FeedbackRepository for PgFeedbackRepository {
    async fn create(&self, req: CreateFeedbackRequest) -> Result<Feedback> {
        req.validate()?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let row = sqlx::query(&format!(
            "INSERT INTO feedbacks (idea_id, user_id, content, files_url, feedback_links, user_tag)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            FEEDBACK_COLUMNS
        ))
        .bind(req.idea_id)
        .bind(&req.user_id)
        .bind(&req.content)
        .bind(&req.files_url)
        .bind(&req.feedback_links)
        .bind(req.user_tag.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::from_db)?;
        let feedback = feedback_from_row(&row)?;

        sqlx::query(
            "INSERT INTO ideas_feedbacks (idea_id, feedback_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(feedback.idea_id)
        .bind(feedback.id)
        .execute(&mut *tx)
        .await
        .map_err(Error::from_db)?;

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "database",
            component = "feedbacks",
            op = "create",
            feedback_id = feedback.id,
            idea_id = feedback.idea_id,
            "Feedback created"
        );
        Ok(feedback)
    }

    async fn get(&self, id: i64) -> Result<Option<Feedback>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM feedbacks WHERE id = $1",
            FEEDBACK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::from_db)?;
        row.as_ref().map(feedback_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Feedback>> {
        self.fetch_many(
            &format!("SELECT {} FROM feedbacks ORDER BY id", FEEDBACK_COLUMNS),
            None,
        )
        .await
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Feedback>> {
        self.fetch_many(
            &format!(
                "SELECT {} FROM feedbacks WHERE user_id = $1 ORDER BY id",
                FEEDBACK_COLUMNS
            ),
            Some(user_id),
        )
        .await
    }

    async fn list_for_idea(&self, idea_id: i64) -> Result<Vec<Feedback>> {
        let rows = sqlx::query(
            "SELECT f.id, f.idea_id, f.user_id, f.content, f.files_url, f.feedback_links,
                    f.user_tag, f.upvotes, f.downvotes, f.created_at
             FROM feedbacks f
             JOIN ideas_feedbacks j ON j.feedback_id = f.id
             WHERE j.idea_id = $1
             ORDER BY f.id",
        )
        .bind(idea_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::from_db)?;
        rows.iter().map(feedback_from_row).collect()
    }

    async fn update(&self, id: i64, req: UpdateFeedbackRequest) -> Result<Feedback> {
        req.validate()?;

        let row = sqlx::query(&format!(
            "UPDATE feedbacks SET
                content = COALESCE($2, content),
                files_url = COALESCE($3, files_url),
                feedback_links = COALESCE($4, feedback_links),
                user_tag = COALESCE($5, user_tag)
             WHERE id = $1 RETURNING {}",
            FEEDBACK_COLUMNS
        ))
        .bind(id)
        .bind(req.content.as_deref())
        .bind(req.files_url.as_ref())
        .bind(req.feedback_links.as_ref())
        .bind(req.user_tag.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::from_db)?
        .ok_or_else(|| Error::NotFound(format!("Feedback {} not found", id)))?;
        feedback_from_row(&row)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM feedbacks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::from_db)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Feedback {} not found", id)));
        }
        Ok(())
    }

    async fn vote(
        &self,
        id: i64,
        direction: VoteDirection,
        change: VoteChange,
    ) -> Result<Feedback> {
        let column = vote_column(direction);
        let row = sqlx::query(&format!(
            "UPDATE feedbacks SET {col} = {col} + $2 WHERE id = $1 RETURNING {cols}",
            col = column,
            cols = FEEDBACK_COLUMNS
        ))
        .bind(id)
        .bind(change.delta())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::from_db)?
        .ok_or_else(|| Error::NotFound(format!("Feedback {} not found", id)))?;
        feedback_from_row(&row)
    }
}
