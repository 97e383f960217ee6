//! Tag repository and the tag normalizer.
//!
//! Normalizing a list of names is three statements: an insert-or-ignore of
//! every candidate name, one lookup resolving all names to ids, and an
//! insert-or-ignore of the junction rows. The `tags_name_key` unique
//! constraint is what keeps concurrent normalizations of the same new name
//! from producing two rows; neither insert raises on conflict, so both
//! callers succeed and resolve the same id.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Pool, Postgres, Row};
use tracing::{debug, info};

use ideaboard_core::{
    dedup_tag_names, validate_tag_name, validate_tag_names, Error, ListTagsQuery, Result,
    SortKey, Tag, TagRepository, TagTarget, VoteChange, VoteDirection,
};

use crate::vote_column;

const TAG_COLUMNS: &str = "id, name, upvotes, downvotes";

/// Junction table, entity column, and parameter cast for a link target.
fn junction_of(target: &TagTarget) -> (&'static str, &'static str, &'static str) {
    match target {
        TagTarget::Idea(_) => ("ideas_tags", "idea_id", "bigint"),
        TagTarget::User(_) => ("users_tags", "user_id", "text"),
        TagTarget::Group(_) => ("groups_tags", "group_id", "bigint"),
    }
}

fn bind_target<'q>(
    query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    target: &'q TagTarget,
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    match target {
        TagTarget::Idea(id) | TagTarget::Group(id) => query.bind(*id),
        TagTarget::User(id) => query.bind(id.as_str()),
    }
}

pub(crate) fn tag_from_row(row: &PgRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        upvotes: row.try_get("upvotes")?,
        downvotes: row.try_get("downvotes")?,
    })
}

/// Ensure every name exists in `tags` and return them in first-occurrence
/// order. Existing rows, and their vote counters, are left untouched.
pub(crate) async fn normalize_on(conn: &mut PgConnection, names: &[String]) -> Result<Vec<Tag>> {
    let names = dedup_tag_names(names);
    if names.is_empty() {
        return Ok(Vec::new());
    }

    // Rows are inserted in sorted order so overlapping concurrent calls take
    // the unique-index locks in the same sequence.
    let mut sorted = names.clone();
    sorted.sort_unstable();
    sqlx::query(
        "INSERT INTO tags (name) SELECT n FROM UNNEST($1::text[]) AS n ORDER BY n \
         ON CONFLICT (name) DO NOTHING",
    )
    .bind(&sorted)
    .execute(&mut *conn)
    .await
    .map_err(Error::from_db)?;

    let rows = sqlx::query(&format!(
        "SELECT {} FROM tags WHERE name = ANY($1::text[])",
        TAG_COLUMNS
    ))
    .bind(&names)
    .fetch_all(&mut *conn)
    .await
    .map_err(Error::from_db)?;

    let mut by_name = HashMap::with_capacity(rows.len());
    for row in &rows {
        let tag = tag_from_row(row)?;
        by_name.insert(tag.name.clone(), tag);
    }

    names
        .iter()
        .map(|name| {
            by_name.remove(name).ok_or_else(|| {
                Error::Internal(format!("tag '{}' was deleted during normalization", name))
            })
        })
        .collect()
}

/// Insert junction rows for the given tag ids, ignoring pairs that exist.
pub(crate) async fn link_ids_on(
    conn: &mut PgConnection,
    target: &TagTarget,
    tag_ids: &[i64],
) -> Result<()> {
    if tag_ids.is_empty() {
        return Ok(());
    }
    let mut tag_ids = tag_ids.to_vec();
    tag_ids.sort_unstable();
    let (junction, column, cast) = junction_of(target);
    let sql = format!(
        "INSERT INTO {junction} ({column}, tag_id) \
         SELECT $1::{cast}, t FROM UNNEST($2::bigint[]) AS t ORDER BY t \
         ON CONFLICT DO NOTHING",
        junction = junction,
        column = column,
        cast = cast,
    );
    bind_target(sqlx::query(&sql), target)
        .bind(&tag_ids)
        .execute(&mut *conn)
        .await
        .map_err(Error::from_db)?;
    Ok(())
}

/// Normalize and link in the caller's transaction.
pub(crate) async fn link_on(
    conn: &mut PgConnection,
    target: &TagTarget,
    names: &[String],
) -> Result<Vec<i64>> {
    let tags = normalize_on(conn, names).await?;
    let ids: Vec<i64> = tags.iter().map(|t| t.id).collect();
    link_ids_on(conn, target, &ids).await?;
    Ok(ids)
}

/// PostgreSQL implementation of TagRepository.
#[derive(Clone)]
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn list(&self, query: ListTagsQuery) -> Result<Vec<Tag>> {
        let order = match query.sort {
            Some(key) => format!(
                "{} {}, id",
                key.column(),
                query.order.unwrap_or_else(|| key.default_order()).as_sql()
            ),
            None => "id".to_string(),
        };
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tags ORDER BY {}",
            TAG_COLUMNS, order
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::from_db)?;

        rows.iter().map(tag_from_row).collect()
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let row = sqlx::query(&format!("SELECT {} FROM tags WHERE name = $1", TAG_COLUMNS))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::from_db)?;
        row.as_ref().map(tag_from_row).transpose()
    }

    async fn delete_by_name(&self, name: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM tags WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(Error::from_db)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Tag '{}' not found", name)));
        }
        info!(subsystem = "database", component = "tags", op = "delete", tag = %name, "Tag deleted");
        Ok(())
    }

    async fn vote(&self, id: i64, direction: VoteDirection, change: VoteChange) -> Result<Tag> {
        let column = vote_column(direction);
        let row = sqlx::query(&format!(
            "UPDATE tags SET {col} = {col} + $2 WHERE id = $1 RETURNING {cols}",
            col = column,
            cols = TAG_COLUMNS
        ))
        .bind(id)
        .bind(change.delta())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::from_db)?
        .ok_or_else(|| Error::NotFound(format!("Tag {} not found", id)))?;
        tag_from_row(&row)
    }

    async fn normalize(&self, names: &[String]) -> Result<Vec<Tag>> {
        validate_tag_names(names)?;
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        let tags = normalize_on(&mut *conn, names).await?;
        debug!(
            subsystem = "database",
            component = "tags",
            op = "normalize",
            tag_count = tags.len(),
            "Tags normalized"
        );
        Ok(tags)
    }

    async fn link(&self, target: &TagTarget, names: &[String]) -> Result<Vec<i64>> {
        validate_tag_names(names)?;
        // The tag rows are committed before the junction insert; a missing
        // target fails the link but leaves the shared vocabulary in place.
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        let ids = link_on(&mut conn, target, names).await?;
        debug!(
            subsystem = "database",
            component = "tags",
            op = "link",
            link_target = ?target,
            tag_count = ids.len(),
            "Tags linked"
        );
        Ok(ids)
    }

    async fn unlink(&self, target: &TagTarget, name: &str) -> Result<()> {
        validate_tag_name(name)?;
        let (junction, column, cast) = junction_of(target);
        let sql = format!(
            "DELETE FROM {junction} j USING tags t \
             WHERE j.tag_id = t.id AND j.{column} = $1::{cast} AND t.name = $2",
            junction = junction,
            column = column,
            cast = cast,
        );
        bind_target(sqlx::query(&sql), target)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(Error::from_db)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_junction_of_each_target() {
        assert_eq!(
            junction_of(&TagTarget::Idea(1)),
            ("ideas_tags", "idea_id", "bigint")
        );
        assert_eq!(
            junction_of(&TagTarget::User("alice".into())),
            ("users_tags", "user_id", "text")
        );
        assert_eq!(
            junction_of(&TagTarget::Group(2)),
            ("groups_tags", "group_id", "bigint")
        );
    }
}
