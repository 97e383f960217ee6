//! User repository implementation.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::info;

use ideaboard_core::{
    CreateUserRequest, Error, ListUsersQuery, Result, TagTarget, UpdateUserRequest, User,
    UserRepository, UserWithTags,
};

use crate::listing::{bind_params, ListQueryBuilder, QueryParam, USERS};
use crate::tags::link_on;

fn user_with_tags_from_row(row: &PgRow) -> Result<UserWithTags> {
    Ok(UserWithTags {
        user: User {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            role: row.try_get("role")?,
            image_url: row.try_get("image_url")?,
        },
        tags: row.try_get("tags")?,
    })
}

/// PostgreSQL implementation of UserRepository.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_required(&self, id: &str) -> Result<UserWithTags> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User '{}' not found", id)))
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, req: CreateUserRequest) -> Result<UserWithTags> {
        req.validate()?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO users (id, name, email, role, image_url) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&req.id)
        .bind(&req.name)
        .bind(&req.email)
        .bind(&req.role)
        .bind(req.image_url.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(Error::from_db)?;

        link_on(&mut tx, &TagTarget::User(req.id.clone()), &req.tags).await?;

        tx.commit().await.map_err(Error::Database)?;

        info!(subsystem = "database", component = "users", op = "create", user_id = %req.id, "User created");
        self.fetch_required(&req.id).await
    }

    async fn get(&self, id: &str) -> Result<Option<UserWithTags>> {
        let (sql, params) = ListQueryBuilder::new(&USERS)
            .with_id(QueryParam::String(id.to_string()))
            .build();
        let row = bind_params(sqlx::query(&sql), params)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::from_db)?;
        row.as_ref().map(user_with_tags_from_row).transpose()
    }

    async fn list(&self, query: ListUsersQuery) -> Result<Vec<UserWithTags>> {
        let (sql, params) = ListQueryBuilder::new(&USERS)
            .with_tag(query.tag)
            .order_by(query.sort, query.order)
            .build();
        let rows = bind_params(sqlx::query(&sql), params)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::from_db)?;
        rows.iter().map(user_with_tags_from_row).collect()
    }

    async fn update(&self, id: &str, req: UpdateUserRequest) -> Result<UserWithTags> {
        req.validate()?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let result = sqlx::query(
            "UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                image_url = COALESCE($5, image_url)
             WHERE id = $1",
        )
        .bind(id)
        .bind(req.name.as_deref())
        .bind(req.email.as_deref())
        .bind(req.role.as_deref())
        .bind(req.image_url.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(Error::from_db)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("User '{}' not found", id)));
        }

        if let Some(tags) = &req.tags {
            link_on(&mut tx, &TagTarget::User(id.to_string()), tags).await?;
        }

        tx.commit().await.map_err(Error::Database)?;
        self.fetch_required(id).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::from_db)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("User '{}' not found", id)));
        }
        info!(subsystem = "database", component = "users", op = "delete", user_id = %id, "User deleted");
        Ok(())
    }
}
